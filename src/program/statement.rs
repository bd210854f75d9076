//! Statements: one executable operation each

use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use super::{Assertion, VarRef};
use crate::cluster::{ConstructorRef, FieldRef, MethodRef, Type};

/// Constant value of a literal statement
#[derive(Debug, Clone)]
pub enum Literal {
    /// `null`
    Null,
    /// Boolean constant
    Bool(bool),
    /// Integral constant (byte through long)
    Int(i64),
    /// Floating-point constant
    Float(f64),
    /// Character constant
    Char(char),
    /// String constant
    Str(String),
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Char(c) => c.hash(state),
            Self::Str(s) => s.hash(state),
        }
    }
}

impl Literal {
    /// Source rendering of the constant
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::Char(c) => format!("{c:?}"),
            Self::Str(s) => format!("{s:?}"),
        }
    }
}

/// Kind of mock placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockKind {
    /// Pure functional mock of an interface
    Functional,
    /// Mock standing in for an abstract class
    AbstractClass,
}

/// Array statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArrayOp {
    /// Allocate an array
    New {
        /// Number of slots
        length: usize,
    },
    /// Assign a value to one slot
    Store {
        /// Written slot
        target: VarRef,
        /// Stored value
        value: VarRef,
    },
}

/// Closed set of statement kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Constructor invocation, or a mock placeholder when `mock` is set
    Construct {
        /// Invoked constructor
        constructor: ConstructorRef,
        /// Arguments, one per parameter
        args: Vec<VarRef>,
        /// Placeholder kind for mocks
        mock: Option<MockKind>,
    },
    /// Method call
    Call {
        /// Invoked method
        method: MethodRef,
        /// Receiver; `None` for static methods
        callee: Option<VarRef>,
        /// Arguments, one per parameter
        args: Vec<VarRef>,
    },
    /// Field read
    FieldAccess {
        /// Read field
        field: FieldRef,
        /// Object holding the field; `None` for static fields
        source: Option<VarRef>,
    },
    /// Array allocation or store
    Array(ArrayOp),
    /// Literal constant
    Primitive(Literal),
}

/// One executable operation of a program
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    kind: StatementKind,
    ty: Type,
    assertions: Vec<Assertion>,
}

impl Statement {
    /// Create a statement with an explicit declared result type
    #[must_use]
    pub fn new(kind: StatementKind, ty: Type) -> Self {
        Self {
            kind,
            ty,
            assertions: Vec::new(),
        }
    }

    /// Constructor invocation
    #[must_use]
    pub fn construct(constructor: ConstructorRef, args: Vec<VarRef>) -> Self {
        let ty = constructor.declaring.clone();
        Self::new(
            StatementKind::Construct {
                constructor,
                args,
                mock: None,
            },
            ty,
        )
    }

    /// Mock placeholder for `ty`
    #[must_use]
    pub fn mock(ty: Type, kind: MockKind) -> Self {
        Self::new(
            StatementKind::Construct {
                constructor: ConstructorRef {
                    declaring: ty.clone(),
                    params: Vec::new(),
                },
                args: Vec::new(),
                mock: Some(kind),
            },
            ty,
        )
    }

    /// Method call declared with the method's natural return type
    #[must_use]
    pub fn call(method: MethodRef, callee: Option<VarRef>, args: Vec<VarRef>) -> Self {
        let ty = method.returns.clone();
        Self::new(StatementKind::Call { method, callee, args }, ty)
    }

    /// Field read
    #[must_use]
    pub fn field_access(field: FieldRef, source: Option<VarRef>) -> Self {
        let ty = field.ty.clone();
        Self::new(StatementKind::FieldAccess { field, source }, ty)
    }

    /// Array allocation
    #[must_use]
    pub fn new_array(component: Type, length: usize) -> Self {
        Self::new(StatementKind::Array(ArrayOp::New { length }), Type::array_of(component))
    }

    /// Store `value` into `array[index]`
    #[must_use]
    pub fn store(array: &VarRef, index: usize, value: VarRef, component: Type) -> Self {
        Self::new(
            StatementKind::Array(ArrayOp::Store {
                target: array.element(index),
                value,
            }),
            component,
        )
    }

    /// Literal constant
    #[must_use]
    pub fn literal(value: Literal, ty: Type) -> Self {
        Self::new(StatementKind::Primitive(value), ty)
    }

    /// Typed `null`
    #[must_use]
    pub fn null(ty: Type) -> Self {
        Self::literal(Literal::Null, ty)
    }

    /// Statement kind
    #[must_use]
    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    /// Mutable statement kind
    pub fn kind_mut(&mut self) -> &mut StatementKind {
        &mut self.kind
    }

    /// Declared type of the result
    #[must_use]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Change the declared type of the result
    pub fn set_ty(&mut self, ty: Type) {
        self.ty = ty;
    }

    /// Attached assertions
    #[must_use]
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// Attach an assertion unless an identical one is present
    pub fn add_assertion(&mut self, assertion: Assertion) -> bool {
        if self.assertions.contains(&assertion) {
            return false;
        }
        self.assertions.push(assertion);
        true
    }

    /// Detach an assertion
    pub fn remove_assertion(&mut self, assertion: &Assertion) -> bool {
        let before = self.assertions.len();
        self.assertions.retain(|a| a != assertion);
        before != self.assertions.len()
    }

    /// Detach all assertions
    pub fn clear_assertions(&mut self) {
        self.assertions.clear();
    }

    /// Whether the statement is a mock placeholder
    #[must_use]
    pub fn mock_kind(&self) -> Option<MockKind> {
        match &self.kind {
            StatementKind::Construct { mock, .. } => *mock,
            _ => None,
        }
    }

    /// Whether the statement is a literal, `null` included
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, StatementKind::Primitive(_))
    }

    /// Whether the statement is an array store
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(self.kind, StatementKind::Array(ArrayOp::Store { .. }))
    }

    /// Reference to the value this statement produces at `position`
    #[must_use]
    pub fn output(&self, position: usize) -> VarRef {
        match &self.kind {
            StatementKind::Primitive(Literal::Null) => VarRef::Null(position),
            StatementKind::Array(ArrayOp::Store { target, .. }) => target.clone(),
            _ => VarRef::Value(position),
        }
    }

    /// References the statement reads as inputs
    #[must_use]
    pub fn reads(&self) -> Vec<&VarRef> {
        match &self.kind {
            StatementKind::Construct { args, .. } => args.iter().collect(),
            StatementKind::Call { callee, args, .. } => callee.iter().chain(args.iter()).collect(),
            StatementKind::FieldAccess { source, .. } => source.iter().collect(),
            StatementKind::Array(ArrayOp::Store { target, value }) => vec![target, value],
            StatementKind::Array(ArrayOp::New { .. }) | StatementKind::Primitive(_) => Vec::new(),
        }
    }

    fn reads_mut(&mut self) -> Vec<&mut VarRef> {
        match &mut self.kind {
            StatementKind::Construct { args, .. } => args.iter_mut().collect(),
            StatementKind::Call { callee, args, .. } => {
                callee.iter_mut().chain(args.iter_mut()).collect()
            }
            StatementKind::FieldAccess { source, .. } => source.iter_mut().collect(),
            StatementKind::Array(ArrayOp::Store { target, value }) => vec![target, value],
            StatementKind::Array(ArrayOp::New { .. }) | StatementKind::Primitive(_) => Vec::new(),
        }
    }

    /// Every reference involved in the statement at `position`
    ///
    /// The statement's own output, every read, and the additional
    /// reference of each.
    #[must_use]
    pub fn variable_references(&self, position: usize) -> Vec<VarRef> {
        let output = self.output(position);
        let mut refs = Vec::new();
        let mut push = |r: &VarRef| {
            if !refs.contains(r) {
                refs.push(r.clone());
            }
        };
        push(&output);
        if let Some(additional) = output.additional() {
            push(additional);
        }
        for read in self.reads() {
            push(read);
            if let Some(additional) = read.additional() {
                push(additional);
            }
        }
        refs
    }

    /// Whether the statement at `position` involves `var`
    #[must_use]
    pub fn references(&self, position: usize, var: &VarRef) -> bool {
        self.variable_references(position)
            .iter()
            .any(|r| r.same_value(var))
    }

    /// Whether the statement is well-formed at `position`
    ///
    /// Every read must resolve to a statement strictly before `position`,
    /// and calls and constructors must have one argument per parameter.
    #[must_use]
    pub fn is_valid(&self, position: usize) -> bool {
        let backward = self
            .reads()
            .into_iter()
            .all(|r| !r.is_dangling() && r.position().is_some_and(|p| p < position));
        let arity = match &self.kind {
            StatementKind::Construct {
                constructor,
                args,
                mock,
            } => mock.is_some() || constructor.params.len() == args.len(),
            StatementKind::Call {
                method,
                callee,
                args,
            } => method.params.len() == args.len() && (method.is_static || callee.is_some()),
            StatementKind::FieldAccess { field, source } => field.is_static || source.is_some(),
            StatementKind::Array(_) | StatementKind::Primitive(_) => true,
        };
        backward && arity
    }

    /// Renumber every reference read by the statement or its assertions
    pub fn remap(&mut self, map: &impl Fn(usize) -> Option<usize>) {
        for read in self.reads_mut() {
            read.remap(map);
        }
        for assertion in &mut self.assertions {
            assertion.remap(map);
        }
    }

    /// Rewrite every read of `old` to `new`
    pub fn replace(&mut self, old: &VarRef, new: &VarRef) {
        for read in self.reads_mut() {
            read.replace(old, new);
        }
        for assertion in &mut self.assertions {
            assertion.replace(old, new);
        }
    }

    /// Textual rendering of the statement at `position`, assertions included
    #[must_use]
    pub fn code(&self, position: usize) -> String {
        let var = VarRef::Value(position);
        let args = |args: &[VarRef]| {
            args.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let declare = |expr: String| {
            if self.ty.is_void() {
                format!("{expr};")
            } else {
                format!("{} {var} = {expr};", self.ty)
            }
        };
        let mut code = match &self.kind {
            StatementKind::Construct {
                mock: Some(_), ..
            } => declare(format!("mock({}.class)", self.ty)),
            StatementKind::Construct {
                constructor, args: a, ..
            } => declare(format!("new {}({})", constructor.declaring, args(a))),
            StatementKind::Call {
                method,
                callee,
                args: a,
            } => {
                let receiver = callee
                    .as_ref()
                    .map_or_else(|| method.declaring.to_string(), ToString::to_string);
                declare(format!("{receiver}.{}({})", method.name, args(a)))
            }
            StatementKind::FieldAccess { field, source } => {
                let holder = source
                    .as_ref()
                    .map_or_else(|| field.declaring.to_string(), ToString::to_string);
                declare(format!("{holder}.{}", field.name))
            }
            StatementKind::Array(ArrayOp::New { length }) => {
                let component = self.ty.component().unwrap_or(&self.ty);
                declare(format!("new {component}[{length}]"))
            }
            StatementKind::Array(ArrayOp::Store { target, value }) => {
                format!("{target} = {value};")
            }
            StatementKind::Primitive(value) => declare(value.code()),
        };
        for assertion in &self.assertions {
            let _ = write!(code, "\n{}", assertion.code());
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> Type {
        Type::class("Stack")
    }

    fn push() -> MethodRef {
        MethodRef {
            declaring: stack(),
            name: "push".to_string(),
            params: vec![Type::int()],
            returns: Type::Void,
            is_static: false,
        }
    }

    #[test]
    fn test_literal_float_equality_by_bits() {
        assert_eq!(Literal::Float(f64::NAN), Literal::Float(f64::NAN));
        assert_ne!(Literal::Float(0.0), Literal::Float(-0.0));
        assert_ne!(Literal::Int(1), Literal::Float(1.0));
    }

    #[test]
    fn test_output_kinds() {
        assert_eq!(Statement::null(stack()).output(3), VarRef::Null(3));
        assert_eq!(Statement::literal(Literal::Int(1), Type::int()).output(3), VarRef::Value(3));
        let store = Statement::store(&VarRef::Value(0), 2, VarRef::Value(1), Type::int());
        assert_eq!(store.output(2), VarRef::Value(0).element(2));
    }

    #[test]
    fn test_variable_references_include_output_and_additional() {
        let store = Statement::store(&VarRef::Value(0), 1, VarRef::Value(1), Type::int());
        let refs = store.variable_references(2);
        assert!(refs.contains(&VarRef::Value(0).element(1)));
        assert!(refs.contains(&VarRef::Value(0)));
        assert!(refs.contains(&VarRef::Value(1)));
        assert!(store.references(2, &VarRef::Value(0)));
    }

    #[test]
    fn test_validity_requires_backward_reads() {
        let call = Statement::call(push(), Some(VarRef::Value(0)), vec![VarRef::Value(1)]);
        assert!(call.is_valid(2));
        assert!(!call.is_valid(1));

        let missing_receiver = Statement::call(push(), None, vec![VarRef::Value(0)]);
        assert!(!missing_receiver.is_valid(5));

        let dangling = Statement::call(push(), Some(VarRef::Dangling), vec![VarRef::Value(0)]);
        assert!(!dangling.is_valid(5));
    }

    #[test]
    fn test_code_rendering() {
        let ctor = Statement::construct(
            ConstructorRef {
                declaring: stack(),
                params: vec![],
            },
            vec![],
        );
        assert_eq!(ctor.code(0), "Stack var0 = new Stack();");
        let call = Statement::call(push(), Some(VarRef::Value(0)), vec![VarRef::Value(1)]);
        assert_eq!(call.code(2), "var0.push(var1);");
        let array = Statement::new_array(Type::int(), 3);
        assert_eq!(array.code(1), "int[] var1 = new int[3];");
        let text = Statement::literal(Literal::Str("a\"b".to_string()), Type::string());
        assert_eq!(text.code(0), "String var0 = \"a\\\"b\";");
    }

    #[test]
    fn test_assertion_dedup() {
        let mut stmt = Statement::literal(Literal::Int(4), Type::int());
        let assertion = Assertion::Primitive {
            source: VarRef::Value(0),
            value: Literal::Int(4),
        };
        assert!(stmt.add_assertion(assertion.clone()));
        assert!(!stmt.add_assertion(assertion.clone()));
        assert!(stmt.remove_assertion(&assertion));
        assert!(stmt.assertions().is_empty());
    }
}
