//! Argument and return types of the builtin functions.

use crate::common::ValueType;
use crate::parser::{ArgCountError, ParseError, ParseResult};

/// A function's type signature, which defines the function's supported argument types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// arguments of an exact type with an optional minimum. Trailing arguments
    /// past the minimum may be omitted.
    Exact(Vec<ValueType>, Option<usize>),
    /// the listed types, with the last one repeating; the second element is the
    /// minimum number of arguments
    Variadic(Vec<ValueType>, usize),
}

///The Signature of a function defines its supported input types as well as its return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub type_signature: TypeSignature,
    pub return_type: ValueType,
}

impl Signature {
    /// Creates a signature which must match the types in `exact_types` in order.
    pub fn exact(exact_types: Vec<ValueType>, return_type: ValueType) -> Self {
        Signature {
            type_signature: TypeSignature::Exact(exact_types, None),
            return_type,
        }
    }

    /// Creates a signature which must match the types in `exact_types` in order,
    /// with only the first `min` required.
    pub fn exact_with_min_args(
        exact_types: Vec<ValueType>,
        min: usize,
        return_type: ValueType,
    ) -> Self {
        let min_arg = min.min(exact_types.len());
        Signature {
            type_signature: TypeSignature::Exact(exact_types, Some(min_arg)),
            return_type,
        }
    }

    pub fn variadic_min(types: Vec<ValueType>, min: usize, return_type: ValueType) -> Self {
        Signature {
            type_signature: TypeSignature::Variadic(types, min),
            return_type,
        }
    }

    pub fn min_args(&self) -> usize {
        match &self.type_signature {
            TypeSignature::Exact(types, min) => min.unwrap_or(types.len()),
            TypeSignature::Variadic(_, min) => *min,
        }
    }

    pub fn max_args(&self) -> Option<usize> {
        match &self.type_signature {
            TypeSignature::Exact(types, _) => Some(types.len()),
            TypeSignature::Variadic(..) => None,
        }
    }

    /// Validate argument counts matches the signature.
    pub fn validate_arg_count(&self, name: &str, arg_len: usize) -> ParseResult<()> {
        let min = self.min_args();
        let max = self.max_args();
        if arg_len < min || max.is_some_and(|max| arg_len > max) {
            return Err(ParseError::InvalidArgCount(ArgCountError::new(
                name, min, max, arg_len,
            )));
        }
        Ok(())
    }

    /// The expected type of the argument at `idx`.
    pub fn arg_type(&self, idx: usize) -> Option<ValueType> {
        match &self.type_signature {
            TypeSignature::Exact(types, _) => types.get(idx).copied(),
            TypeSignature::Variadic(types, _) => types.get(idx).or(types.last()).copied(),
        }
    }
}
