use std::sync::Arc;
use std::time::Duration;

use crate::provider::{MetricStorage, NullMetricStorage};

pub const DEFAULT_LOOKBACK_DELTA: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_SAMPLES: usize = 10000;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(100);
pub const DEFAULT_SUBQUERY_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// How far back a vector selector looks for the latest sample.
    pub lookback_delta: Duration,
    /// Upper bound on the samples a single query may hold.
    pub max_samples: usize,
    pub timeout: Duration,
    /// Step used by subqueries that omit one.
    pub subquery_interval: Duration,
    pub enable_at_modifier: bool,
    pub enable_negative_offset: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            lookback_delta: DEFAULT_LOOKBACK_DELTA,
            max_samples: DEFAULT_MAX_SAMPLES,
            timeout: DEFAULT_QUERY_TIMEOUT,
            subquery_interval: DEFAULT_SUBQUERY_INTERVAL,
            enable_at_modifier: false,
            enable_negative_offset: false,
        }
    }
}

impl EngineOptions {
    pub(crate) fn lookback_millis(&self) -> i64 {
        self.lookback_delta.as_millis() as i64
    }

    pub(crate) fn subquery_interval_millis(&self) -> i64 {
        self.subquery_interval.as_millis() as i64
    }
}

/// Everything a query needs: the storage to read from and the engine options.
pub struct Context {
    pub storage: Arc<dyn MetricStorage>,
    pub options: EngineOptions,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric_storage(mut self, storage: Arc<dyn MetricStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for Context {
    fn default() -> Self {
        Self {
            storage: Arc::new(NullMetricStorage {}),
            options: EngineOptions::default(),
        }
    }
}
