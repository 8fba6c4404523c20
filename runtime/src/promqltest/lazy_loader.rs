use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::parser::{parse_script, LoadCmd};
use super::LoadError;
use crate::execution::{Context, EngineOptions};
use crate::types::MetricName;
use crate::{MemoryMetricProvider, RuntimeResult};

/// LazyLoader lazily loads samples into storage: samples defined by the load
/// script are only appended once a query needs them.
pub struct LazyLoader {
    load_cmd: LoadCmd,
    series: Vec<MetricName>,
    storage: Arc<MemoryMetricProvider>,
    context: Context,
}

impl LazyLoader {
    pub fn new(input: &str, options: EngineOptions) -> Result<Self, LoadError> {
        let load_cmd = parse_script(input)?;
        let series = load_cmd.series().cloned().collect();
        let storage = Arc::new(MemoryMetricProvider::new());
        let context = Context::new()
            .with_metric_storage(storage.clone())
            .with_options(options);
        Ok(LazyLoader {
            load_cmd,
            series,
            storage,
            context,
        })
    }

    /// Appends the pending samples with timestamps up to `ts` (milliseconds).
    /// Every sample is appended at most once.
    fn append_till(&mut self, ts: i64) -> RuntimeResult<()> {
        let mut appended = 0;
        for (hash, points) in self.load_cmd.defs.iter_mut() {
            let Some(metric) = self.load_cmd.metrics.get(hash) else {
                continue;
            };
            let due = points.partition_point(|p| p.t <= ts);
            for p in points.drain(..due) {
                self.storage.append(metric.clone(), p.t, p.v);
                appended += 1;
            }
        }
        if appended > 0 {
            debug!(ts, appended, "appended pending samples");
        }
        Ok(())
    }

    /// Loads the samples till `ts` and calls `f` with the outcome and the
    /// context to query with.
    pub fn with_samples_till<F, R>(&mut self, ts: i64, f: F) -> R
    where
        F: FnOnce(RuntimeResult<()>, &Context) -> R,
    {
        let res = self.append_till(ts);
        f(res, &self.context)
    }

    /// Step used by subqueries that do not give one.
    pub fn set_subquery_interval(&mut self, interval: Duration) {
        self.context.options.subquery_interval = interval;
    }

    /// Only the samples up to the largest timestamp given to
    /// `with_samples_till` can be queried through it.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn storage(&self) -> Arc<MemoryMetricProvider> {
        self.storage.clone()
    }

    /// Every series the script defines, loaded or not.
    pub fn series(&self) -> &[MetricName] {
        &self.series
    }

    pub fn pending_samples(&self) -> usize {
        self.load_cmd.pending_samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MetricStorage, SearchQuery};
    use pretty_assertions::assert_eq;
    use promfix_parser::label::Matcher;

    const SCRIPT: &str = r#"
load 1m
  up{job="a"} 1 2 3 4
  up{job="b"} 0 _ 1
"#;

    fn loader() -> LazyLoader {
        LazyLoader::new(SCRIPT, EngineOptions::default()).unwrap()
    }

    fn stored(ll: &LazyLoader) -> usize {
        ll.storage().sample_count()
    }

    #[test]
    fn nothing_is_loaded_up_front() {
        let ll = loader();
        assert_eq!(stored(&ll), 0);
        assert_eq!(ll.pending_samples(), 6);
        assert_eq!(ll.series().len(), 2);
    }

    #[test]
    fn loads_samples_up_to_the_given_time_once() {
        let mut ll = loader();
        ll.with_samples_till(60_000, |res, _| res.unwrap());
        assert_eq!(stored(&ll), 3);

        ll.with_samples_till(60_000, |res, _| res.unwrap());
        assert_eq!(stored(&ll), 3);

        ll.with_samples_till(10 * 60_000, |res, _| res.unwrap());
        assert_eq!(stored(&ll), 6);
        assert_eq!(ll.pending_samples(), 0);
    }

    #[test]
    fn callback_sees_the_loaded_storage() {
        let mut ll = loader();
        let series = ll.with_samples_till(0, |res, ctx| {
            res.unwrap();
            let sq = SearchQuery::new(0, 0, vec![Matcher::equal("__name__", "up")]);
            ctx.storage.search(&sq).unwrap()
        });
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn subquery_interval_is_configurable() {
        let mut ll = loader();
        ll.set_subquery_interval(Duration::from_secs(15));
        assert_eq!(ll.context().options.subquery_interval, Duration::from_secs(15));
    }

    #[test]
    fn script_errors_are_returned() {
        let err = LazyLoader::new("clear", EngineOptions::default()).err();
        assert_eq!(
            err,
            Some(LoadError::InvalidCommand {
                line: 1,
                command: "clear".to_string()
            })
        );
    }

    #[test]
    fn storage_is_shared_as_trait_object() {
        let ll = loader();
        let storage: Arc<dyn MetricStorage> = ll.storage();
        assert!(storage.label_names().unwrap().is_empty());
    }
}
