//! Position-based variable references

use std::fmt;

use crate::cluster::FieldRef;

/// Identifies a value produced inside one program
///
/// References are positions into the owning statement sequence, never
/// pointers, so cloning a program clones its references for free and a
/// removal only has to renumber integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarRef {
    /// Return value of the statement at a position
    Value(usize),
    /// `null` produced by the literal statement at a position
    Null(usize),
    /// Field read through another reference
    Field {
        /// Object holding the field
        source: Box<VarRef>,
        /// Accessed field
        field: FieldRef,
    },
    /// One slot of an array
    ArrayElement {
        /// Array holding the element
        array: Box<VarRef>,
        /// Slot index
        index: usize,
    },
    /// Points at a statement that has been removed
    Dangling,
}

impl VarRef {
    /// Field of this reference
    #[must_use]
    pub fn field(&self, field: FieldRef) -> Self {
        Self::Field {
            source: Box::new(self.clone()),
            field,
        }
    }

    /// Element of this array reference
    #[must_use]
    pub fn element(&self, index: usize) -> Self {
        Self::ArrayElement {
            array: Box::new(self.clone()),
            index,
        }
    }

    /// Position of the statement that produced the underlying value
    ///
    /// Field and array-element references report the position of their
    /// base object. `None` for dangling references.
    #[must_use]
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Value(p) | Self::Null(p) => Some(*p),
            Self::Field { source, .. } => source.position(),
            Self::ArrayElement { array, .. } => array.position(),
            Self::Dangling => None,
        }
    }

    /// Reference this one implicitly depends on
    #[must_use]
    pub fn additional(&self) -> Option<&VarRef> {
        match self {
            Self::Field { source, .. } => Some(source.additional().unwrap_or(source)),
            Self::ArrayElement { array, .. } => Some(array),
            _ => None,
        }
    }

    /// Number of field hops below the base object
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Field { source, .. } => source.depth() + 1,
            _ => 0,
        }
    }

    /// Whether this denotes a `null` literal
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    /// Whether this is a field reference
    #[must_use]
    pub fn is_field(&self) -> bool {
        matches!(self, Self::Field { .. })
    }

    /// Whether this is an array-element reference
    #[must_use]
    pub fn is_array_element(&self) -> bool {
        matches!(self, Self::ArrayElement { .. })
    }

    /// Whether the reference lost its producing statement
    #[must_use]
    pub fn is_dangling(&self) -> bool {
        match self {
            Self::Dangling => true,
            Self::Field { source, .. } => source.is_dangling(),
            Self::ArrayElement { array, .. } => array.is_dangling(),
            _ => false,
        }
    }

    /// Whether both references denote the same value
    ///
    /// A direct return value and a null reference at the same position
    /// are the same value.
    #[must_use]
    pub fn same_value(&self, other: &VarRef) -> bool {
        match (self, other) {
            (Self::Value(a) | Self::Null(a), Self::Value(b) | Self::Null(b)) => a == b,
            (
                Self::Field { source: s1, field: f1 },
                Self::Field { source: s2, field: f2 },
            ) => f1 == f2 && s1.same_value(s2),
            (
                Self::ArrayElement { array: a1, index: i1 },
                Self::ArrayElement { array: a2, index: i2 },
            ) => i1 == i2 && a1.same_value(a2),
            _ => false,
        }
    }

    /// Renumber every position through `map`; unmapped positions dangle
    pub fn remap(&mut self, map: &impl Fn(usize) -> Option<usize>) {
        let replacement = match self {
            Self::Value(p) | Self::Null(p) => match map(*p) {
                Some(next) => {
                    *p = next;
                    None
                }
                None => Some(Self::Dangling),
            },
            Self::Field { source, .. } => {
                source.remap(map);
                source.is_dangling().then_some(Self::Dangling)
            }
            Self::ArrayElement { array, .. } => {
                array.remap(map);
                array.is_dangling().then_some(Self::Dangling)
            }
            Self::Dangling => None,
        };
        if let Some(dangling) = replacement {
            *self = dangling;
        }
    }

    /// Replace this reference, or any base of it, that denotes `old`
    pub fn replace(&mut self, old: &VarRef, new: &VarRef) {
        if self.same_value(old) {
            *self = new.clone();
            return;
        }
        match self {
            Self::Field { source, .. } => source.replace(old, new),
            Self::ArrayElement { array, .. } => array.replace(old, new),
            _ => {}
        }
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(p) | Self::Null(p) => write!(f, "var{p}"),
            Self::Field { source, field } => write!(f, "{source}.{}", field.name),
            Self::ArrayElement { array, index } => write!(f, "{array}[{index}]"),
            Self::Dangling => write!(f, "<dangling>"),
        }
    }
}
