//! Type model of the unit under analysis
//!
//! Programs never inspect a runtime; every type question (is `Square`
//! assignable to `Shape`? which fields does `Node` expose?) goes through
//! the [`TypeCluster`] trait.
//!
//! # Assignability
//!
//! | From | To | Rule |
//! |------|----|------|
//! | primitive | primitive | identity or widening (`int` → `long`) |
//! | primitive | class | boxing, then class assignability |
//! | wrapper | primitive | unboxing, then widening |
//! | class | class | supertype walk; everything reaches `Object` |
//! | array | array | identical primitive components, else component assignability |

mod static_cluster;
mod types;

pub use static_cluster::{ClassDecl, FieldDecl, MethodDecl, StaticCluster};
pub use types::{ConstructorRef, FieldRef, MethodRef, PrimitiveType, Type};

/// A member that a statement can invoke or read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callable {
    /// Public constructor
    Constructor(ConstructorRef),
    /// Public method
    Method(MethodRef),
    /// Public field read
    Field(FieldRef),
}

impl Callable {
    /// Type of the value produced by invoking the member
    #[must_use]
    pub fn produces(&self) -> &Type {
        match self {
            Self::Constructor(c) => &c.declaring,
            Self::Method(m) => &m.returns,
            Self::Field(f) => &f.ty,
        }
    }

    /// Short human-readable signature
    #[must_use]
    pub fn signature(&self) -> String {
        let render = |params: &[Type]| {
            params
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::Constructor(c) => format!("new {}({})", c.declaring, render(&c.params)),
            Self::Method(m) => format!("{}.{}({})", m.declaring, m.name, render(&m.params)),
            Self::Field(f) => format!("{}.{}", f.declaring, f.name),
        }
    }
}

/// Type questions answered on behalf of programs and generators
pub trait TypeCluster: Send + Sync {
    /// Whether a value of type `from` can be used where `to` is expected
    fn is_assignable(&self, from: &Type, to: &Type) -> bool;

    /// Public instance fields of `ty`, including inherited ones
    fn accessible_fields(&self, ty: &Type) -> Vec<FieldRef>;

    /// Method of `ty` (or a supertype) with exactly these parameter types
    fn find_method(&self, ty: &Type, name: &str, params: &[Type]) -> Option<MethodRef>;

    /// Public constructors of `ty`; empty for abstract types
    fn constructors(&self, ty: &Type) -> Vec<ConstructorRef>;

    /// Every member a generator may turn into a statement
    fn callables(&self) -> Vec<Callable>;

    /// Constructible classes assignable to `ty`
    fn concrete_subtypes(&self, ty: &Type) -> Vec<Type>;
}
