use std::fmt;
use std::fmt::Display;

use promfix_parser::label::Matcher;

use crate::types::Series;
use crate::RuntimeResult;

/// Read access to stored series.
pub trait MetricStorage: Sync + Send {
    /// Returns every series matching all of `sq.matchers`, restricted to
    /// the points in `[sq.start, sq.end]` and ordered by label set. Series
    /// without points in the range are omitted.
    fn search(&self, sq: &SearchQuery) -> RuntimeResult<Vec<Series>>;

    /// Sorted, unique label names over all series.
    fn label_names(&self) -> RuntimeResult<Vec<String>>;

    /// Sorted, unique values of the label `name` over all series.
    fn label_values(&self, name: &str) -> RuntimeResult<Vec<String>>;
}

pub struct NullMetricStorage {}

impl MetricStorage for NullMetricStorage {
    fn search(&self, _sq: &SearchQuery) -> RuntimeResult<Vec<Series>> {
        Ok(vec![])
    }

    fn label_names(&self) -> RuntimeResult<Vec<String>> {
        Ok(vec![])
    }

    fn label_values(&self, _name: &str) -> RuntimeResult<Vec<String>> {
        Ok(vec![])
    }
}

/// SearchQuery is used for selecting series from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Inclusive start of the time range in milliseconds.
    pub start: i64,
    /// Inclusive end of the time range in milliseconds.
    pub end: i64,
    pub matchers: Vec<Matcher>,
}

impl SearchQuery {
    pub fn new(start: i64, end: i64, matchers: Vec<Matcher>) -> Self {
        SearchQuery {
            start,
            end,
            matchers,
        }
    }
}

impl Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let filters = self
            .matchers
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "filters={{{filters}}}, timeRange=[{}..{}]",
            self.start, self.end
        )
    }
}
