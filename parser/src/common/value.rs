use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A query value type
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// A 64-bit floating point number.
    Scalar,
    /// An owned String
    String,
    #[default]
    InstantVector,
    RangeVector,
}

impl ValueType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ValueType::Scalar => "scalar",
            ValueType::String => "string",
            ValueType::InstantVector => "instant vector",
            ValueType::RangeVector => "range vector",
        }
    }

    /// Returns true if a value of this type may be an operand of a binary
    /// or unary operator.
    pub const fn is_operator_valid(&self) -> bool {
        matches!(self, ValueType::Scalar | ValueType::InstantVector)
    }

    pub const fn is_scalar(&self) -> bool {
        matches!(self, ValueType::Scalar)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
