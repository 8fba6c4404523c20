use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::common::ValueType;
use crate::functions::signature::Signature;
use crate::parser::ParseError;

/// Functions taking a range vector and reducing every series to one sample.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Hash, EnumIter, Serialize, Deserialize,
)]
pub enum RollupFunction {
    AbsentOverTime,
    AvgOverTime,
    Changes,
    CountOverTime,
    Delta,
    Deriv,
    IDelta,
    Increase,
    IRate,
    LastOverTime,
    MaxOverTime,
    MinOverTime,
    PredictLinear,
    PresentOverTime,
    QuantileOverTime,
    Rate,
    Resets,
    StddevOverTime,
    StdvarOverTime,
    SumOverTime,
}

impl Display for RollupFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl RollupFunction {
    pub const fn name(&self) -> &'static str {
        use RollupFunction::*;

        match self {
            AbsentOverTime => "absent_over_time",
            AvgOverTime => "avg_over_time",
            Changes => "changes",
            CountOverTime => "count_over_time",
            Delta => "delta",
            Deriv => "deriv",
            IDelta => "idelta",
            Increase => "increase",
            IRate => "irate",
            LastOverTime => "last_over_time",
            MaxOverTime => "max_over_time",
            MinOverTime => "min_over_time",
            PredictLinear => "predict_linear",
            PresentOverTime => "present_over_time",
            QuantileOverTime => "quantile_over_time",
            Rate => "rate",
            Resets => "resets",
            StddevOverTime => "stddev_over_time",
            StdvarOverTime => "stdvar_over_time",
            SumOverTime => "sum_over_time",
        }
    }

    /// the signatures supported by the function `fun`.
    pub fn signature(&self) -> Signature {
        use RollupFunction::*;
        use ValueType::*;

        match self {
            PredictLinear => Signature::exact(vec![RangeVector, Scalar], InstantVector),
            QuantileOverTime => Signature::exact(vec![Scalar, RangeVector], InstantVector),
            _ => Signature::exact(vec![RangeVector], InstantVector),
        }
    }

    /// Index of the range vector argument.
    pub const fn range_arg_index(&self) -> usize {
        match self {
            RollupFunction::QuantileOverTime => 1,
            _ => 0,
        }
    }

    pub const fn keep_metric_name(&self) -> bool {
        matches!(self, RollupFunction::LastOverTime)
    }

    /// Functions treating their input as a counter, adjusting for resets.
    pub const fn is_counter(&self) -> bool {
        use RollupFunction::*;
        matches!(self, Rate | Increase | IRate)
    }
}

impl FromStr for RollupFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RollupFunction::iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ParseError::UnknownFunction(s.to_string()))
    }
}
