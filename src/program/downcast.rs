//! Redundant downcast removal

use super::{Assertion, Program, Statement, StatementKind, VarRef};
use crate::cluster::{Type, TypeCluster};

impl Program {
    /// Widen call results whose narrowed declared type no reader needs
    ///
    /// A call declared with a type narrower than the method's natural
    /// return type keeps the narrowing only if an assertion, a later
    /// receiver, argument or field read depends on it. Each call is
    /// checked against its direct readers only.
    pub fn remove_downcasts(&mut self, cluster: &dyn TypeCluster) {
        for position in 0..self.statements.len() {
            let statement = &self.statements[position];
            let StatementKind::Call { method, .. } = statement.kind() else {
                continue;
            };
            let natural = method.returns.clone();
            let declared = statement.ty();
            if *declared == natural || !cluster.is_assignable(declared, &natural) {
                continue;
            }
            log::debug!("found downcast from {natural} to {declared} at {position}");
            let output = statement.output(position);
            if self.downcast_needed(position, &output, &natural, cluster) {
                continue;
            }
            log::debug!("downcast not needed, widening to {natural}");
            self.statements[position].set_ty(natural);
        }
        debug_assert!(self.is_valid(), "invalid after downcast removal:\n{}", self.to_code());
    }

    fn downcast_needed(
        &self,
        position: usize,
        var: &VarRef,
        natural: &Type,
        cluster: &dyn TypeCluster,
    ) -> bool {
        if assertions_need_downcast(&self.statements[position], var, natural, cluster) {
            return true;
        }
        self.reference_positions(var).into_iter().any(|usage| {
            let statement = &self.statements[usage];
            assertions_need_downcast(statement, var, natural, cluster)
                || usage_needs_downcast(statement, var, natural, cluster)
                || statement
                    .reads()
                    .into_iter()
                    .any(|read| field_read_needs_downcast(read, var, natural, cluster))
        })
    }
}

fn assertions_need_downcast(
    statement: &Statement,
    var: &VarRef,
    natural: &Type,
    cluster: &dyn TypeCluster,
) -> bool {
    statement.assertions().iter().any(|assertion| match assertion {
        Assertion::Inspector {
            source, inspector, ..
        } if source.same_value(var) => cluster
            .find_method(natural, &inspector.name, &inspector.params)
            .is_none(),
        Assertion::PrimitiveField { source, field, .. } if source.same_value(var) => {
            !cluster.is_assignable(natural, &field.declaring)
        }
        _ => false,
    })
}

fn usage_needs_downcast(
    statement: &Statement,
    var: &VarRef,
    natural: &Type,
    cluster: &dyn TypeCluster,
) -> bool {
    let params_need = |params: &[Type], args: &[VarRef]| {
        params
            .iter()
            .zip(args)
            .any(|(param, arg)| arg.same_value(var) && !cluster.is_assignable(natural, param))
    };
    match statement.kind() {
        StatementKind::Call {
            method,
            callee,
            args,
        } => {
            let receiver_needs = !method.is_static
                && callee.as_ref().is_some_and(|c| c.same_value(var))
                && cluster
                    .find_method(natural, &method.name, &method.params)
                    .map_or(true, |inherited| inherited.returns != method.returns);
            receiver_needs || params_need(&method.params, args)
        }
        StatementKind::Construct {
            constructor, args, ..
        } => params_need(&constructor.params, args),
        StatementKind::FieldAccess { field, source } => {
            !field.is_static
                && source.as_ref().is_some_and(|s| s.same_value(var))
                && !cluster.is_assignable(natural, &field.declaring)
        }
        StatementKind::Array(_) | StatementKind::Primitive(_) => false,
    }
}

fn field_read_needs_downcast(
    read: &VarRef,
    var: &VarRef,
    natural: &Type,
    cluster: &dyn TypeCluster,
) -> bool {
    match read {
        VarRef::Field { source, field } if source.same_value(var) => {
            !cluster.is_assignable(natural, &field.declaring)
        }
        VarRef::Field { source, .. } => field_read_needs_downcast(source, var, natural, cluster),
        _ => false,
    }
}
