use promfix_parser::common::ValueType;

use crate::types::{Sample, Series};
use crate::{RuntimeError, RuntimeResult};

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Scalar(f64),
    String(String),
    InstantVector(Vec<Sample>),
    RangeVector(Vec<Series>),
}

impl QueryValue {
    pub fn data_type(&self) -> ValueType {
        match self {
            QueryValue::Scalar(_) => ValueType::Scalar,
            QueryValue::String(_) => ValueType::String,
            QueryValue::InstantVector(_) => ValueType::InstantVector,
            QueryValue::RangeVector(_) => ValueType::RangeVector,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, QueryValue::Scalar(_))
    }

    pub fn len(&self) -> usize {
        match self {
            QueryValue::Scalar(_) | QueryValue::String(_) => 1,
            QueryValue::InstantVector(v) => v.len(),
            QueryValue::RangeVector(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_scalar(&self) -> RuntimeResult<f64> {
        match self {
            QueryValue::Scalar(v) => Ok(*v),
            _ => Err(self.cast_error(ValueType::Scalar)),
        }
    }

    pub fn get_string(&self) -> RuntimeResult<&str> {
        match self {
            QueryValue::String(s) => Ok(s),
            _ => Err(self.cast_error(ValueType::String)),
        }
    }

    pub fn into_instant_vector(self) -> RuntimeResult<Vec<Sample>> {
        match self {
            QueryValue::InstantVector(v) => Ok(v),
            other => Err(other.cast_error(ValueType::InstantVector)),
        }
    }

    pub fn into_range_vector(self) -> RuntimeResult<Vec<Series>> {
        match self {
            QueryValue::RangeVector(m) => Ok(m),
            other => Err(other.cast_error(ValueType::RangeVector)),
        }
    }

    fn cast_error(&self, expected: ValueType) -> RuntimeError {
        RuntimeError::TypeCastError(format!(
            "cannot cast {} to {expected}",
            self.data_type()
        ))
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Scalar(v)
    }
}

impl From<Vec<Sample>> for QueryValue {
    fn from(v: Vec<Sample>) -> Self {
        QueryValue::InstantVector(v)
    }
}
