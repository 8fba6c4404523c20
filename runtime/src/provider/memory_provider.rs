use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use itertools::Itertools;

use promfix_common::hash::Signature;
use promfix_parser::label::Matcher;

use crate::provider::{MetricStorage, SearchQuery};
use crate::types::{MetricName, Point, Series};
use crate::RuntimeResult;

/// In-memory implementation of MetricStorage used to hold fixture data.
#[derive(Default, Debug)]
pub struct MemoryMetricProvider {
    inner: RwLock<Storage>,
}

#[derive(Default, Debug, Clone)]
struct StoredSeries {
    metric: MetricName,
    points: Vec<Point>,
}

#[derive(Default, Debug, Clone)]
struct Storage {
    series: BTreeMap<Signature, StoredSeries>,
}

impl Storage {
    fn append(&mut self, metric: MetricName, t: i64, v: f64) {
        let h = metric.signature();
        let series = self.series.entry(h).or_insert_with(|| StoredSeries {
            metric,
            points: vec![],
        });
        let points = &mut series.points;
        // appends are almost always in time order
        if points.last().map_or(true, |p| p.t < t) {
            points.push(Point::new(t, v));
            return;
        }
        match points.binary_search_by_key(&t, |p| p.t) {
            Ok(idx) => points[idx].v = v,
            Err(idx) => points.insert(idx, Point::new(t, v)),
        }
    }

    fn search(&self, sq: &SearchQuery) -> Vec<Series> {
        self.series
            .values()
            .filter(|s| matches_all(&s.metric, &sq.matchers))
            .filter_map(|s| {
                let points = points_in_range(&s.points, sq.start, sq.end);
                if points.is_empty() {
                    return None;
                }
                Some(Series::new(s.metric.clone(), points.to_vec()))
            })
            .sorted_by(|a, b| a.metric.cmp(&b.metric))
            .collect()
    }

    fn label_names(&self) -> Vec<String> {
        self.series
            .values()
            .flat_map(|s| s.metric.iter().map(|l| l.name.as_str()))
            .unique()
            .sorted()
            .map(String::from)
            .collect()
    }

    fn label_values(&self, name: &str) -> Vec<String> {
        self.series
            .values()
            .filter_map(|s| s.metric.get(name))
            .unique()
            .sorted()
            .map(String::from)
            .collect()
    }
}

impl MemoryMetricProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Storage> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Storage> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a point. A point at an existing timestamp overwrites it.
    pub fn append(&self, metric: MetricName, t: i64, v: f64) {
        self.write().append(metric, t, v)
    }

    pub fn clear(&self) {
        self.write().series.clear()
    }

    pub fn series_count(&self) -> usize {
        self.read().series.len()
    }

    pub fn sample_count(&self) -> usize {
        self.read().series.values().map(|s| s.points.len()).sum()
    }
}

impl MetricStorage for MemoryMetricProvider {
    fn search(&self, sq: &SearchQuery) -> RuntimeResult<Vec<Series>> {
        Ok(self.read().search(sq))
    }

    fn label_names(&self) -> RuntimeResult<Vec<String>> {
        Ok(self.read().label_names())
    }

    fn label_values(&self, name: &str) -> RuntimeResult<Vec<String>> {
        Ok(self.read().label_values(name))
    }
}

/// A missing label matches as the empty string.
fn matches_all(mn: &MetricName, matchers: &[Matcher]) -> bool {
    matchers
        .iter()
        .all(|m| m.matches(mn.get(&m.name).unwrap_or("")))
}

fn points_in_range(points: &[Point], start: i64, end: i64) -> &[Point] {
    let first = points.partition_point(|p| p.t < start);
    let last = points.partition_point(|p| p.t <= end);
    if first >= last {
        return &[];
    }
    &points[first..last]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metric(pairs: &[(&str, &str)]) -> MetricName {
        MetricName::from_strings(pairs)
    }

    fn provider() -> MemoryMetricProvider {
        let p = MemoryMetricProvider::new();
        let a = metric(&[("__name__", "up"), ("job", "b")]);
        let b = metric(&[("__name__", "up"), ("job", "a")]);
        let c = metric(&[("__name__", "down")]);
        for t in [0, 10, 20] {
            p.append(a.clone(), t, t as f64);
            p.append(b.clone(), t, 1.0);
        }
        p.append(c, 5, 7.0);
        p
    }

    #[test]
    fn search_filters_and_orders() {
        let p = provider();
        let sq = SearchQuery::new(0, 15, vec![Matcher::equal("__name__", "up")]);
        let res = p.search(&sq).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].metric.get("job"), Some("a"));
        assert_eq!(res[1].metric.get("job"), Some("b"));
        assert_eq!(res[1].points, vec![Point::new(0, 0.0), Point::new(10, 10.0)]);
    }

    #[test]
    fn missing_label_matches_empty() {
        let p = provider();
        let sq = SearchQuery::new(0, 100, vec![Matcher::equal("job", "")]);
        let res = p.search(&sq).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].metric.metric_name(), Some("down"));
    }

    #[test]
    fn series_without_points_in_range_are_omitted() {
        let p = provider();
        let sq = SearchQuery::new(21, 100, vec![Matcher::not_equal("__name__", "")]);
        assert!(p.search(&sq).unwrap().is_empty());
    }

    #[test]
    fn out_of_order_append_and_overwrite() {
        let p = MemoryMetricProvider::new();
        let m = metric(&[("__name__", "x")]);
        p.append(m.clone(), 20, 2.0);
        p.append(m.clone(), 10, 1.0);
        p.append(m.clone(), 20, 3.0);
        let res = p
            .search(&SearchQuery::new(0, 100, vec![Matcher::equal("__name__", "x")]))
            .unwrap();
        assert_eq!(res[0].points, vec![Point::new(10, 1.0), Point::new(20, 3.0)]);
        assert_eq!(p.sample_count(), 2);
    }

    #[test]
    fn labels() {
        let p = provider();
        assert_eq!(p.label_names().unwrap(), vec!["__name__", "job"]);
        assert_eq!(p.label_values("job").unwrap(), vec!["a", "b"]);
        assert_eq!(p.label_values("__name__").unwrap(), vec!["down", "up"]);
        assert!(p.label_values("nope").unwrap().is_empty());
        assert_eq!(p.series_count(), 3);
        p.clear();
        assert_eq!(p.series_count(), 0);
    }
}
