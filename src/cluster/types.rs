//! Static types and member signatures of the unit under analysis

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Primitive value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// `boolean`
    Boolean,
    /// `char`
    Char,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl PrimitiveType {
    /// All primitive types
    #[must_use]
    pub fn all() -> [Self; 8] {
        [
            Self::Boolean,
            Self::Char,
            Self::Byte,
            Self::Short,
            Self::Int,
            Self::Long,
            Self::Float,
            Self::Double,
        ]
    }

    /// Source keyword of the type
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Simple name of the boxed counterpart
    #[must_use]
    pub fn wrapper_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Char => "Character",
            Self::Byte => "Byte",
            Self::Short => "Short",
            Self::Int => "Integer",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }

    /// Primitive whose boxed counterpart has the given simple name
    #[must_use]
    pub fn from_wrapper_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|p| p.wrapper_name() == name)
    }

    /// Whether a value of this type converts to `target` without a cast
    #[must_use]
    pub fn widens_to(self, target: Self) -> bool {
        use PrimitiveType::{Boolean, Byte, Char, Double, Float, Int, Long, Short};
        if self == target {
            return true;
        }
        match self {
            Boolean | Double => false,
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short | Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => target == Double,
        }
    }

    /// Whether the type holds integral values
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Int | Self::Long | Self::Char)
    }
}

/// Declared static type of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Type {
    /// No value
    Void,
    /// Primitive value
    Primitive(PrimitiveType),
    /// Reference to an instance of a named class or interface
    Class(String),
    /// Array with the given component type
    Array(Box<Type>),
}

impl Type {
    /// Shorthand for a class type
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    /// Shorthand for an array type
    #[must_use]
    pub fn array_of(component: Type) -> Self {
        Self::Array(Box::new(component))
    }

    /// `int`
    #[must_use]
    pub fn int() -> Self {
        Self::Primitive(PrimitiveType::Int)
    }

    /// `boolean`
    #[must_use]
    pub fn boolean() -> Self {
        Self::Primitive(PrimitiveType::Boolean)
    }

    /// `String`
    #[must_use]
    pub fn string() -> Self {
        Self::Class("String".to_string())
    }

    /// Whether this is a primitive type
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Whether this is an array type
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Whether this is `void`
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Whether this is a boxed primitive
    #[must_use]
    pub fn is_wrapper(&self) -> bool {
        self.unboxed().is_some()
    }

    /// Whether this is the string type
    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Class(_)) && self.simple_name() == "String"
    }

    /// Whether this is the root object type
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Class(_)) && self.simple_name() == "Object"
    }

    /// Primitive type of a boxed primitive
    #[must_use]
    pub fn unboxed(&self) -> Option<PrimitiveType> {
        match self {
            Self::Class(_) => PrimitiveType::from_wrapper_name(self.simple_name()),
            _ => None,
        }
    }

    /// Component type of an array
    #[must_use]
    pub fn component(&self) -> Option<&Type> {
        match self {
            Self::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Innermost non-array type
    #[must_use]
    pub fn element(&self) -> &Type {
        match self {
            Self::Array(component) => component.element(),
            other => other,
        }
    }

    /// Class name without its package qualifier
    #[must_use]
    pub fn simple_name(&self) -> &str {
        match self {
            Self::Class(name) => name.rsplit('.').next().unwrap_or(name),
            Self::Primitive(p) => p.keyword(),
            Self::Void => "void",
            Self::Array(component) => component.simple_name(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Primitive(p) => write!(f, "{}", p.keyword()),
            Self::Class(name) => write!(f, "{name}"),
            Self::Array(component) => write!(f, "{component}[]"),
        }
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(component) = s.strip_suffix("[]") {
            return Ok(Self::array_of(component.parse()?));
        }
        if s.is_empty() || s.contains(char::is_whitespace) {
            return Err(Error::Configuration(format!("invalid type name '{s}'")));
        }
        if s == "void" {
            return Ok(Self::Void);
        }
        Ok(PrimitiveType::all()
            .into_iter()
            .find(|p| p.keyword() == s)
            .map_or_else(|| Self::Class(s.to_string()), Self::Primitive))
    }
}

impl TryFrom<String> for Type {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Type> for String {
    fn from(value: Type) -> Self {
        value.to_string()
    }
}

/// A method of the unit under analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Class that declares the method
    pub declaring: Type,
    /// Method name
    pub name: String,
    /// Parameter types
    pub params: Vec<Type>,
    /// Natural (declared) return type
    pub returns: Type,
    /// Whether the method is static
    pub is_static: bool,
}

/// A constructor of the unit under analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorRef {
    /// Constructed class
    pub declaring: Type,
    /// Parameter types
    pub params: Vec<Type>,
}

/// A field of the unit under analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Class that declares the field
    pub declaring: Type,
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
    /// Whether the field is static
    pub is_static: bool,
}
