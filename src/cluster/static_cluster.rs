//! Serde-loadable class model
//!
//! A `StaticCluster` describes the classes reachable from the unit under
//! analysis: their supertypes, constructors, methods and public fields.
//! It is normally read from a JSON file:
//!
//! ```json
//! {
//!   "classes": [
//!     { "name": "Stack", "constructors": [[]],
//!       "methods": [ { "name": "push", "params": ["int"] },
//!                    { "name": "pop", "returns": "int" } ] }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Callable, ConstructorRef, FieldRef, MethodRef, PrimitiveType, Type, TypeCluster};
use crate::{Error, Result};

/// Method declaration inside a [`ClassDecl`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name
    pub name: String,
    /// Parameter types
    #[serde(default)]
    pub params: Vec<Type>,
    /// Return type
    #[serde(default = "void")]
    pub returns: Type,
    /// Whether the method is static
    #[serde(default)]
    pub is_static: bool,
}

/// Field declaration inside a [`ClassDecl`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Field name
    pub name: String,
    /// Field type
    #[serde(rename = "type")]
    pub ty: Type,
    /// Whether the field is static
    #[serde(default)]
    pub is_static: bool,
    /// Whether generated programs may access the field
    #[serde(default = "yes")]
    pub public: bool,
}

/// One class or interface of the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Class name
    pub name: String,
    /// Direct superclass
    #[serde(default)]
    pub superclass: Option<String>,
    /// Implemented interfaces
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Abstract classes and interfaces cannot be constructed
    #[serde(default)]
    pub is_abstract: bool,
    /// Parameter lists of the public constructors
    #[serde(default)]
    pub constructors: Vec<Vec<Type>>,
    /// Public methods
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
    /// Fields
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

fn void() -> Type {
    Type::Void
}

fn yes() -> bool {
    true
}

impl ClassDecl {
    /// Create an empty concrete class
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            interfaces: Vec::new(),
            is_abstract: false,
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Set the superclass
    #[must_use]
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Mark the class abstract
    #[must_use]
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Add a public constructor
    #[must_use]
    pub fn with_constructor(mut self, params: Vec<Type>) -> Self {
        self.constructors.push(params);
        self
    }

    /// Add an instance method
    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, params: Vec<Type>, returns: Type) -> Self {
        self.methods.push(MethodDecl {
            name: name.into(),
            params,
            returns,
            is_static: false,
        });
        self
    }

    /// Add a static method
    #[must_use]
    pub fn with_static_method(
        mut self,
        name: impl Into<String>,
        params: Vec<Type>,
        returns: Type,
    ) -> Self {
        self.methods.push(MethodDecl {
            name: name.into(),
            params,
            returns,
            is_static: true,
        });
        self
    }

    /// Add a public instance field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
            is_static: false,
            public: true,
        });
        self
    }

    fn ty(&self) -> Type {
        Type::Class(self.name.clone())
    }

    fn method_ref(&self, decl: &MethodDecl) -> MethodRef {
        MethodRef {
            declaring: self.ty(),
            name: decl.name.clone(),
            params: decl.params.clone(),
            returns: decl.returns.clone(),
            is_static: decl.is_static,
        }
    }

    fn field_ref(&self, decl: &FieldDecl) -> FieldRef {
        FieldRef {
            declaring: self.ty(),
            name: decl.name.clone(),
            ty: decl.ty.clone(),
            is_static: decl.is_static,
        }
    }
}

#[derive(Deserialize, Serialize)]
struct ClusterFile {
    classes: Vec<ClassDecl>,
}

/// Class model loaded from a description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCluster {
    classes: BTreeMap<String, ClassDecl>,
}

impl StaticCluster {
    /// Create an empty cluster
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class, replacing any previous declaration with the same name
    #[must_use]
    pub fn with_class(mut self, class: ClassDecl) -> Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    /// Parse a cluster from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a class is declared twice
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ClusterFile = serde_json::from_str(json)?;
        let mut classes = BTreeMap::new();
        for class in file.classes {
            if classes.contains_key(&class.name) {
                return Err(Error::Configuration(format!(
                    "class '{}' declared twice",
                    class.name
                )));
            }
            classes.insert(class.name.clone(), class);
        }
        Ok(Self { classes })
    }

    /// Load a cluster from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize the cluster back to JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        let file = ClusterFile {
            classes: self.classes.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Declared class by name
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    /// Iterate over all declared classes
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.classes.values()
    }

    /// Number of declared classes
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the cluster declares no class
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Declared classes of `name` and its supertypes, nearest first
    fn hierarchy(&self, name: &str) -> Vec<&ClassDecl> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([name.to_string()]);
        let mut out = Vec::new();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(class) = self.classes.get(&next) {
                queue.extend(class.superclass.iter().cloned());
                queue.extend(class.interfaces.iter().cloned());
                out.push(class);
            }
        }
        out
    }

    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        self.hierarchy(sub).iter().any(|class| {
            class.superclass.as_deref() == Some(sup) || class.interfaces.iter().any(|i| i == sup)
        })
    }
}

impl TypeCluster for StaticCluster {
    fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return !from.is_void();
        }
        match (from, to) {
            (Type::Void, _) | (_, Type::Void) => false,
            (Type::Primitive(a), Type::Primitive(b)) => a.widens_to(*b),
            (Type::Primitive(a), Type::Class(_)) => {
                let boxed = Type::class(a.wrapper_name());
                boxed.simple_name() == to.simple_name() || self.is_assignable(&boxed, to)
            }
            (Type::Class(_), Type::Primitive(b)) => {
                from.unboxed().is_some_and(|a| a.widens_to(*b))
            }
            (Type::Class(a), Type::Class(b)) => {
                to.is_object()
                    || self.is_subclass(a, b)
                    || (to.simple_name() == "Number"
                        && from
                            .unboxed()
                            .is_some_and(|p| p != PrimitiveType::Boolean && p != PrimitiveType::Char))
            }
            (Type::Array(a), Type::Array(b)) => {
                if a.is_primitive() || b.is_primitive() {
                    a == b
                } else {
                    self.is_assignable(a, b)
                }
            }
            (Type::Array(_), Type::Class(_)) => to.is_object(),
            _ => false,
        }
    }

    fn accessible_fields(&self, ty: &Type) -> Vec<FieldRef> {
        let Type::Class(name) = ty else {
            return Vec::new();
        };
        self.hierarchy(name)
            .into_iter()
            .flat_map(|class| {
                class
                    .fields
                    .iter()
                    .filter(|f| f.public && !f.is_static)
                    .map(|f| class.field_ref(f))
            })
            .collect()
    }

    fn find_method(&self, ty: &Type, name: &str, params: &[Type]) -> Option<MethodRef> {
        let Type::Class(class_name) = ty else {
            return None;
        };
        self.hierarchy(class_name).into_iter().find_map(|class| {
            class
                .methods
                .iter()
                .find(|m| m.name == name && m.params == params)
                .map(|m| class.method_ref(m))
        })
    }

    fn constructors(&self, ty: &Type) -> Vec<ConstructorRef> {
        let Type::Class(name) = ty else {
            return Vec::new();
        };
        self.classes
            .get(name)
            .filter(|class| !class.is_abstract)
            .map(|class| {
                class
                    .constructors
                    .iter()
                    .map(|params| ConstructorRef {
                        declaring: class.ty(),
                        params: params.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn callables(&self) -> Vec<Callable> {
        let mut out = Vec::new();
        for class in self.classes.values() {
            if !class.is_abstract {
                out.extend(class.constructors.iter().map(|params| {
                    Callable::Constructor(ConstructorRef {
                        declaring: class.ty(),
                        params: params.clone(),
                    })
                }));
            }
            out.extend(class.methods.iter().map(|m| Callable::Method(class.method_ref(m))));
            out.extend(
                class
                    .fields
                    .iter()
                    .filter(|f| f.public)
                    .map(|f| Callable::Field(class.field_ref(f))),
            );
        }
        out
    }

    fn concrete_subtypes(&self, ty: &Type) -> Vec<Type> {
        self.classes
            .values()
            .filter(|class| !class.is_abstract && !class.constructors.is_empty())
            .map(ClassDecl::ty)
            .filter(|candidate| self.is_assignable(candidate, ty))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> StaticCluster {
        StaticCluster::new()
            .with_class(
                ClassDecl::new("Shape")
                    .abstract_class()
                    .with_method("area", vec![], Type::Primitive(PrimitiveType::Double)),
            )
            .with_class(
                ClassDecl::new("Square")
                    .extends("Shape")
                    .implements("Comparable")
                    .with_constructor(vec![Type::int()])
                    .with_field("side", Type::int()),
            )
            .with_class(ClassDecl::new("Comparable").abstract_class())
    }

    #[test]
    fn test_subclass_assignability() {
        let cluster = shapes();
        assert!(cluster.is_assignable(&Type::class("Square"), &Type::class("Shape")));
        assert!(cluster.is_assignable(&Type::class("Square"), &Type::class("Comparable")));
        assert!(!cluster.is_assignable(&Type::class("Shape"), &Type::class("Square")));
        assert!(cluster.is_assignable(&Type::class("Shape"), &Type::class("Object")));
    }

    #[test]
    fn test_primitive_and_boxing_assignability() {
        let cluster = shapes();
        assert!(cluster.is_assignable(&Type::int(), &Type::class("Integer")));
        assert!(cluster.is_assignable(&Type::class("Integer"), &Type::int()));
        assert!(cluster.is_assignable(&Type::int(), &Type::class("Object")));
        assert!(!cluster.is_assignable(&Type::int(), &Type::boolean()));
        assert!(!cluster.is_assignable(&Type::Void, &Type::Void));
    }

    #[test]
    fn test_array_assignability() {
        let cluster = shapes();
        let squares = Type::array_of(Type::class("Square"));
        let shapes_ty = Type::array_of(Type::class("Shape"));
        assert!(cluster.is_assignable(&squares, &shapes_ty));
        assert!(!cluster.is_assignable(&Type::array_of(Type::int()), &Type::array_of(Type::class("Integer"))));
        assert!(cluster.is_assignable(&squares, &Type::class("Object")));
    }

    #[test]
    fn test_inherited_method_lookup() {
        let cluster = shapes();
        let method = cluster
            .find_method(&Type::class("Square"), "area", &[])
            .expect("area should be inherited");
        assert_eq!(method.declaring, Type::class("Shape"));
        assert!(cluster.find_method(&Type::class("Square"), "area", &[Type::int()]).is_none());
    }

    #[test]
    fn test_abstract_classes_not_constructed() {
        let cluster = shapes();
        assert!(cluster.constructors(&Type::class("Shape")).is_empty());
        assert_eq!(cluster.constructors(&Type::class("Square")).len(), 1);
        assert_eq!(
            cluster.concrete_subtypes(&Type::class("Shape")),
            vec![Type::class("Square")]
        );
    }

    #[test]
    fn test_accessible_fields() {
        let cluster = shapes();
        let fields = cluster.accessible_fields(&Type::class("Square"));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "side");
        assert!(cluster.accessible_fields(&Type::int()).is_empty());
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let dir = tempfile::tempdir().expect("tempdir should succeed");
        let path = dir.path().join("cluster.json");
        std::fs::write(&path, shapes().to_json().expect("to_json should succeed"))
            .expect("write should succeed");
        let loaded = StaticCluster::from_json_file(&path).expect("load should succeed");
        assert_eq!(loaded, shapes());
    }

    #[test]
    fn test_json_defaults() {
        let cluster = StaticCluster::from_json_str(
            r#"{"classes":[{"name":"Stack","constructors":[[]],
                "methods":[{"name":"push","params":["int"]},{"name":"pop","returns":"int"}]}]}"#,
        )
        .expect("parse should succeed");
        let push = cluster
            .find_method(&Type::class("Stack"), "push", &[Type::int()])
            .expect("push should exist");
        assert!(push.returns.is_void());
        assert_eq!(cluster.callables().len(), 3);
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let err = StaticCluster::from_json_str(r#"{"classes":[{"name":"A"},{"name":"A"}]}"#)
            .expect_err("duplicate should fail");
        assert!(matches!(err, Error::Configuration(_)));
    }
}
