use std::fs;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use promfix_common::time::current_time_millis;
use promfix_runtime::promqltest::LazyLoader;
use promfix_runtime::{instant_query, MetricName, QueryValue, Sample};

use crate::config::Config;
use crate::error::{ServerError, ServerResult, SetupError};
use crate::fixture::{build_load_script, UnitTestFile};
use crate::index::LabelIndex;
use crate::metadata::MetadataStore;

const SUBQUERY_INTERVAL: Duration = Duration::from_secs(60);

/// Serves instant queries over the series of a single fixture file.
pub struct FixtureEngine {
    loader: Mutex<LazyLoader>,
    eval_time: i64,
    index: LabelIndex,
    metadata: MetadataStore,
}

impl FixtureEngine {
    pub fn setup(path: &Path, config: &Config) -> Result<Self, SetupError> {
        let input = fs::read_to_string(path).map_err(|source| SetupError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        info!(fixture = %path.display(), "loading fixture");
        Self::from_yaml(&input, config)
    }

    pub fn from_yaml(input: &str, config: &Config) -> Result<Self, SetupError> {
        let file = UnitTestFile::from_yaml(input)?;
        let script = build_load_script(&file)?;
        debug!(%script, "built load script");

        let mut loader = LazyLoader::new(&script, config.engine_options())?;
        loader.set_subquery_interval(SUBQUERY_INTERVAL);

        let index = LabelIndex::new(loader.series());
        info!(
            series = loader.series().len(),
            metrics = index.metric_names().len(),
            "loaded fixture series"
        );
        let metadata = MetadataStore::new(index.metric_names());

        Ok(FixtureEngine {
            loader: Mutex::new(loader),
            eval_time: config.eval_time_millis(),
            index,
            metadata,
        })
    }

    /// Runs `query` at the configured evaluation time. Scalars come back as
    /// a single sample without labels.
    pub fn exec(&self, query: &str) -> ServerResult<Vec<Sample>> {
        debug!(query, eval_time = self.eval_time, "executing query");
        let mut loader = self.loader.lock().unwrap_or_else(PoisonError::into_inner);
        loader.with_samples_till(current_time_millis(), |res, ctx| {
            res?;
            let rv = instant_query(ctx, query, self.eval_time)?;
            into_samples(rv, self.eval_time)
        })
    }

    pub fn eval_time(&self) -> i64 {
        self.eval_time
    }

    pub fn labels(&self) -> &LabelIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}

fn into_samples(rv: QueryValue, ts: i64) -> ServerResult<Vec<Sample>> {
    match rv {
        QueryValue::InstantVector(samples) => Ok(samples),
        QueryValue::Scalar(v) => Ok(vec![Sample::new(MetricName::default(), ts, v)]),
        _ => Err(ServerError::UnexpectedResult),
    }
}
