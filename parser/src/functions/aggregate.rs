//! AggregateFunction module contains enum for available aggregation AggregateFunctions.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::common::ValueType;
use crate::parser::ParseError;

/// Aggregation AggregateFunctions
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Hash, EnumIter, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// calculate the average over dimensions
    Avg,
    /// smallest k elements by sample value
    Bottomk,
    /// count the number of elements in the vector
    Count,
    /// count the number of elements with the same value
    CountValues,
    /// all values in the resulting vector are 1
    Group,
    /// calculate maximum over dimensions
    Max,
    /// calculate minimum over dimensions
    Min,
    /// calculate φ-quantile (0 ≤ φ ≤ 1) over dimensions
    Quantile,
    /// calculate population standard deviation over dimensions
    StdDev,
    /// calculate population standard variance over dimensions
    StdVar,
    /// calculate sum over dimensions
    Sum,
    /// largest k elements by sample value
    Topk,
}

impl AggregateFunction {
    pub const fn name(&self) -> &'static str {
        use AggregateFunction::*;
        match self {
            Avg => "avg",
            Bottomk => "bottomk",
            Count => "count",
            CountValues => "count_values",
            Group => "group",
            Max => "max",
            Min => "min",
            Quantile => "quantile",
            StdDev => "stddev",
            StdVar => "stdvar",
            Sum => "sum",
            Topk => "topk",
        }
    }

    /// Type of the leading parameter, for aggregations that take one.
    pub const fn param_type(&self) -> Option<ValueType> {
        use AggregateFunction::*;
        match self {
            Topk | Bottomk | Quantile => Some(ValueType::Scalar),
            CountValues => Some(ValueType::String),
            _ => None,
        }
    }

    /// Aggregations that return input samples rather than one sample per group.
    pub const fn keeps_input_series(&self) -> bool {
        matches!(self, AggregateFunction::Topk | AggregateFunction::Bottomk)
    }
}

impl FromStr for AggregateFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregateFunction::iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::General(format!("invalid aggregation function {s:?}")))
    }
}

impl Display for AggregateFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
