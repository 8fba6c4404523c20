use serde::{Deserialize, Serialize};

use crate::types::MetricName;

/// A single timestamped value of a series.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub t: i64,
    pub v: f64,
}

impl Point {
    pub fn new(t: i64, v: f64) -> Self {
        Self { t, v }
    }
}

/// An element of an instant vector.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub metric: MetricName,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(metric: MetricName, timestamp: i64, value: f64) -> Self {
        Self {
            metric,
            timestamp,
            value,
        }
    }
}

/// A series with its points sorted by time. Elements of a range vector.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub metric: MetricName,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(metric: MetricName, points: Vec<Point>) -> Self {
        Self { metric, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.v)
    }
}

/// Returns true if two samples share a label set.
pub fn contains_same_labelset(samples: &[Sample]) -> bool {
    if samples.len() < 2 {
        return false;
    }
    let mut seen = ahash::AHashSet::with_capacity(samples.len());
    samples.iter().any(|s| !seen.insert(s.metric.signature()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_duplicate_label_sets() {
        let a = Sample::new(MetricName::from_strings(&[("job", "a")]), 0, 1.0);
        let b = Sample::new(MetricName::from_strings(&[("job", "b")]), 0, 1.0);
        assert!(!contains_same_labelset(&[a.clone(), b.clone()]));
        assert!(contains_same_labelset(&[a.clone(), b, a]));
    }
}
