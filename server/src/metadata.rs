use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

const UNITS: [&str; 10] = [
    "seconds", "bytes", "ratio", "percent", "celsius", "meters", "volts", "amperes", "joules",
    "grams",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricType {
    /// Guesses the type from the naming conventions of the exposition format.
    pub fn from_metric_name(name: &str) -> Self {
        if name.ends_with("_bucket") {
            MetricType::Histogram
        } else if name.ends_with("_total") {
            MetricType::Counter
        } else if name.ends_with("_count") || name.ends_with("_sum") {
            MetricType::Summary
        } else {
            MetricType::Gauge
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricMetadata {
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub help: String,
    pub unit: String,
}

impl MetricMetadata {
    pub fn infer(name: &str) -> Self {
        MetricMetadata {
            metric_type: MetricType::from_metric_name(name),
            help: String::new(),
            unit: infer_unit(name).unwrap_or_default().to_string(),
        }
    }
}

/// The unit is the last word of the name once a type suffix is removed,
/// if it is a known unit: `http_request_duration_seconds_bucket` is in
/// seconds.
fn infer_unit(name: &str) -> Option<&'static str> {
    let base = ["_bucket", "_total", "_count", "_sum"]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name);
    let (_, last) = base.rsplit_once('_')?;
    UNITS.iter().find(|unit| **unit == last).copied()
}

/// Metadata of every fixture metric, keyed by metric name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MetadataStore {
    metrics: BTreeMap<String, Vec<MetricMetadata>>,
}

impl MetadataStore {
    pub fn new<'a>(metric_names: impl IntoIterator<Item = &'a str>) -> Self {
        let metrics = metric_names
            .into_iter()
            .map(|name| (name.to_string(), vec![MetricMetadata::infer(name)]))
            .collect();
        MetadataStore { metrics }
    }

    /// Metadata of `metric`, or of every metric when it is `None`. A `limit`
    /// caps the number of metrics returned.
    pub fn query(
        &self,
        metric: Option<&str>,
        limit: Option<usize>,
    ) -> BTreeMap<&str, &[MetricMetadata]> {
        let limit = limit.unwrap_or(usize::MAX);
        self.metrics
            .iter()
            .filter(|(name, _)| metric.is_none_or(|m| m == name.as_str()))
            .take(limit)
            .map(|(name, md)| (name.as_str(), md.as_slice()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("http_request_duration_seconds_bucket", MetricType::Histogram, "seconds")]
    #[test_case("http_requests_total", MetricType::Counter, "")]
    #[test_case("process_cpu_seconds_total", MetricType::Counter, "seconds")]
    #[test_case("rpc_latency_seconds_count", MetricType::Summary, "seconds")]
    #[test_case("response_size_bytes_sum", MetricType::Summary, "bytes")]
    #[test_case("room_temperature_celsius", MetricType::Gauge, "celsius")]
    #[test_case("up", MetricType::Gauge, "")]
    #[test_case("seconds", MetricType::Gauge, "")]
    fn infers_metadata(name: &str, metric_type: MetricType, unit: &str) {
        let md = MetricMetadata::infer(name);
        assert_eq!(md.metric_type, metric_type);
        assert_eq!(md.unit, unit);
        assert_eq!(md.help, "");
    }

    fn store() -> MetadataStore {
        MetadataStore::new(["up", "http_requests_total", "node_memory_bytes"])
    }

    #[test]
    fn query_all() {
        let store = store();
        let res = store.query(None, None);
        let names: Vec<&str> = res.keys().copied().collect();
        assert_eq!(names, vec!["http_requests_total", "node_memory_bytes", "up"]);
    }

    #[test]
    fn query_single_metric() {
        let store = store();
        let res = store.query(Some("up"), None);
        assert_eq!(res.len(), 1);
        assert_eq!(res["up"][0].metric_type, MetricType::Gauge);
        assert!(store.query(Some("missing"), None).is_empty());
    }

    #[test]
    fn query_with_limit() {
        assert_eq!(store().query(None, Some(2)).len(), 2);
    }

    #[test]
    fn serializes_like_the_metadata_api() {
        let md = MetricMetadata::infer("node_memory_bytes");
        assert_eq!(
            serde_json::to_string(&md).unwrap(),
            r#"{"type":"gauge","help":"","unit":"bytes"}"#
        );
    }
}
