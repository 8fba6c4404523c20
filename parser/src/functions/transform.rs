use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::common::ValueType;
use crate::functions::signature::Signature;
use crate::parser::ParseError;

/// Functions operating on instant vectors and scalars.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Hash, EnumIter, Serialize, Deserialize,
)]
pub enum TransformFunction {
    Abs,
    Absent,
    Ceil,
    Clamp,
    ClampMax,
    ClampMin,
    DayOfMonth,
    DayOfWeek,
    DayOfYear,
    DaysInMonth,
    Exp,
    Floor,
    HistogramQuantile,
    Hour,
    LabelJoin,
    LabelReplace,
    Ln,
    Log10,
    Log2,
    Minute,
    Month,
    Round,
    Scalar,
    Sgn,
    Sort,
    SortDesc,
    Sqrt,
    Time,
    Timestamp,
    Vector,
    Year,
}

impl Display for TransformFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TransformFunction {
    pub const fn name(&self) -> &'static str {
        use TransformFunction::*;
        match self {
            Abs => "abs",
            Absent => "absent",
            Ceil => "ceil",
            Clamp => "clamp",
            ClampMax => "clamp_max",
            ClampMin => "clamp_min",
            DayOfMonth => "day_of_month",
            DayOfWeek => "day_of_week",
            DayOfYear => "day_of_year",
            DaysInMonth => "days_in_month",
            Exp => "exp",
            Floor => "floor",
            HistogramQuantile => "histogram_quantile",
            Hour => "hour",
            LabelJoin => "label_join",
            LabelReplace => "label_replace",
            Ln => "ln",
            Log10 => "log10",
            Log2 => "log2",
            Minute => "minute",
            Month => "month",
            Round => "round",
            Scalar => "scalar",
            Sgn => "sgn",
            Sort => "sort",
            SortDesc => "sort_desc",
            Sqrt => "sqrt",
            Time => "time",
            Timestamp => "timestamp",
            Vector => "vector",
            Year => "year",
        }
    }

    pub fn signature(&self) -> Signature {
        use TransformFunction::*;
        use ValueType as VT;

        match self {
            Abs | Absent | Ceil | Exp | Floor | Ln | Log10 | Log2 | Sgn | Sort | SortDesc
            | Sqrt | Timestamp => Signature::exact(vec![VT::InstantVector], VT::InstantVector),
            Clamp => Signature::exact(
                vec![VT::InstantVector, VT::Scalar, VT::Scalar],
                VT::InstantVector,
            ),
            ClampMax | ClampMin => {
                Signature::exact(vec![VT::InstantVector, VT::Scalar], VT::InstantVector)
            }
            DayOfMonth | DayOfWeek | DayOfYear | DaysInMonth | Hour | Minute | Month | Year => {
                Signature::exact_with_min_args(vec![VT::InstantVector], 0, VT::InstantVector)
            }
            HistogramQuantile => {
                Signature::exact(vec![VT::Scalar, VT::InstantVector], VT::InstantVector)
            }
            LabelJoin => Signature::variadic_min(
                vec![VT::InstantVector, VT::String, VT::String, VT::String],
                3,
                VT::InstantVector,
            ),
            LabelReplace => Signature::exact(
                vec![
                    VT::InstantVector,
                    VT::String,
                    VT::String,
                    VT::String,
                    VT::String,
                ],
                VT::InstantVector,
            ),
            Round => Signature::exact_with_min_args(
                vec![VT::InstantVector, VT::Scalar],
                1,
                VT::InstantVector,
            ),
            Scalar => Signature::exact(vec![VT::InstantVector], VT::Scalar),
            Time => Signature::exact(vec![], VT::Scalar),
            Vector => Signature::exact(vec![VT::Scalar], VT::InstantVector),
        }
    }

    pub fn return_type(&self) -> ValueType {
        self.signature().return_type
    }

    pub const fn keep_metric_name(&self) -> bool {
        use TransformFunction::*;
        matches!(self, LabelJoin | LabelReplace | Sort | SortDesc)
    }
}

impl FromStr for TransformFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransformFunction::iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ParseError::UnknownFunction(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for func in TransformFunction::iter() {
            assert_eq!(TransformFunction::from_str(func.name()).unwrap(), func);
        }
    }

    #[test]
    fn scalar_returning_functions() {
        assert_eq!(TransformFunction::Scalar.return_type(), ValueType::Scalar);
        assert_eq!(TransformFunction::Time.return_type(), ValueType::Scalar);
        assert_eq!(TransformFunction::Abs.return_type(), ValueType::InstantVector);
    }
}
