//! Observable checks attached to statements

use super::{Literal, VarRef};
use crate::cluster::{FieldRef, MethodRef};

/// Assertion attached to the statement that produced its source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Assertion {
    /// The source equals a constant
    Primitive {
        /// Checked value
        source: VarRef,
        /// Expected constant
        value: Literal,
    },
    /// The source is (or is not) `null`
    Null {
        /// Checked value
        source: VarRef,
        /// Expected nullness
        is_null: bool,
    },
    /// An inspector method of the source returns a constant
    Inspector {
        /// Receiver of the inspector
        source: VarRef,
        /// Side-effect free getter
        inspector: MethodRef,
        /// Expected result
        value: Literal,
    },
    /// A primitive field of the source holds a constant
    PrimitiveField {
        /// Object holding the field
        source: VarRef,
        /// Checked field
        field: FieldRef,
        /// Expected value
        value: Literal,
    },
    /// An array equals the listed constants element-wise
    ArrayEquals {
        /// Checked array
        source: VarRef,
        /// Expected elements
        values: Vec<Literal>,
    },
}

impl Assertion {
    /// Checked value
    #[must_use]
    pub fn source(&self) -> &VarRef {
        match self {
            Self::Primitive { source, .. }
            | Self::Null { source, .. }
            | Self::Inspector { source, .. }
            | Self::PrimitiveField { source, .. }
            | Self::ArrayEquals { source, .. } => source,
        }
    }

    fn source_mut(&mut self) -> &mut VarRef {
        match self {
            Self::Primitive { source, .. }
            | Self::Null { source, .. }
            | Self::Inspector { source, .. }
            | Self::PrimitiveField { source, .. }
            | Self::ArrayEquals { source, .. } => source,
        }
    }

    /// References read by the assertion
    #[must_use]
    pub fn referenced_variables(&self) -> Vec<&VarRef> {
        let source = self.source();
        source.additional().into_iter().chain([source]).collect()
    }

    /// Renumber the source reference
    pub fn remap(&mut self, map: &impl Fn(usize) -> Option<usize>) {
        self.source_mut().remap(map);
    }

    /// Rewrite the source if it denotes `old`
    pub fn replace(&mut self, old: &VarRef, new: &VarRef) {
        self.source_mut().replace(old, new);
    }

    /// Textual rendering
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Primitive { source, value } => {
                format!("assertEquals({}, {source});", value.code())
            }
            Self::Null { source, is_null } => {
                if *is_null {
                    format!("assertNull({source});")
                } else {
                    format!("assertNotNull({source});")
                }
            }
            Self::Inspector {
                source,
                inspector,
                value,
            } => format!("assertEquals({}, {source}.{}());", value.code(), inspector.name),
            Self::PrimitiveField {
                source,
                field,
                value,
            } => format!("assertEquals({}, {source}.{});", value.code(), field.name),
            Self::ArrayEquals { source, values } => {
                let values = values.iter().map(Literal::code).collect::<Vec<_>>().join(", ");
                format!("assertArrayEquals(new Object[] {{{values}}}, {source});")
            }
        }
    }
}
