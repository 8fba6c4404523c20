use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

pub use aggregate::*;
pub use rollup::*;
use serde::{Deserialize, Serialize};
pub use signature::*;
use strum::IntoEnumIterator;
pub use transform::*;

use crate::common::ValueType;
use crate::parser::{ParseError, ParseResult};

mod aggregate;
mod rollup;
mod signature;
mod transform;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinFunction {
    Rollup(RollupFunction),
    Transform(TransformFunction),
}

impl BuiltinFunction {
    pub fn new(name: &str) -> ParseResult<Self> {
        get_registry()
            .get(name)
            .copied()
            .ok_or_else(|| ParseError::UnknownFunction(name.to_string()))
    }

    pub const fn name(&self) -> &'static str {
        match self {
            BuiltinFunction::Rollup(f) => f.name(),
            BuiltinFunction::Transform(f) => f.name(),
        }
    }

    pub fn signature(&self) -> Signature {
        match self {
            BuiltinFunction::Rollup(f) => f.signature(),
            BuiltinFunction::Transform(f) => f.signature(),
        }
    }

    pub fn return_type(&self) -> ValueType {
        self.signature().return_type
    }

    /// Returns false for functions whose output drops `__name__`.
    pub const fn keep_metric_name(&self) -> bool {
        match self {
            BuiltinFunction::Rollup(f) => f.keep_metric_name(),
            BuiltinFunction::Transform(f) => f.keep_metric_name(),
        }
    }

    pub fn is_rollup(&self) -> bool {
        matches!(self, BuiltinFunction::Rollup(_))
    }
}

impl FromStr for BuiltinFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuiltinFunction::new(s)
    }
}

impl Display for BuiltinFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn get_registry() -> &'static HashMap<&'static str, BuiltinFunction> {
    static REGISTRY: OnceLock<HashMap<&'static str, BuiltinFunction>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = HashMap::with_capacity(64);
        for func in RollupFunction::iter() {
            registry.insert(func.name(), BuiltinFunction::Rollup(func));
        }
        for func in TransformFunction::iter() {
            registry.insert(func.name(), BuiltinFunction::Transform(func));
        }
        registry
    })
}

/// Returns true if `name` is a builtin function (not an aggregation).
pub fn is_function(name: &str) -> bool {
    get_registry().contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup() {
        assert_eq!(
            BuiltinFunction::new("rate").unwrap(),
            BuiltinFunction::Rollup(RollupFunction::Rate)
        );
        assert_eq!(
            BuiltinFunction::new("label_replace").unwrap(),
            BuiltinFunction::Transform(TransformFunction::LabelReplace)
        );
        assert_eq!(
            BuiltinFunction::new("nope").unwrap_err(),
            ParseError::UnknownFunction("nope".to_string())
        );
        assert!(!is_function("sum"));
    }

    #[test]
    fn metric_name_retention() {
        for name in ["last_over_time", "label_replace", "label_join", "sort", "sort_desc"] {
            assert!(BuiltinFunction::new(name).unwrap().keep_metric_name(), "{name}");
        }
        for name in ["rate", "abs", "timestamp", "max_over_time"] {
            assert!(!BuiltinFunction::new(name).unwrap().keep_metric_name(), "{name}");
        }
    }
}
