use std::collections::{BTreeMap, BTreeSet};

use promfix_runtime::MetricName;

/// Label names and their values across every fixture series, built once at
/// startup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LabelIndex {
    labels: BTreeMap<String, BTreeSet<String>>,
}

impl LabelIndex {
    pub fn new<'a>(series: impl IntoIterator<Item = &'a MetricName>) -> Self {
        let mut labels: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for mn in series {
            for label in mn.iter() {
                labels
                    .entry(label.name.clone())
                    .or_default()
                    .insert(label.value.clone());
            }
        }
        LabelIndex { labels }
    }

    /// Sorted label names.
    pub fn names(&self) -> Vec<&str> {
        self.labels.keys().map(String::as_str).collect()
    }

    /// Sorted values of `name`; empty for an unknown label.
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.labels
            .get(name)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Sorted metric names, i.e. the values of `__name__`.
    pub fn metric_names(&self) -> Vec<&str> {
        self.values(promfix_common::label::METRIC_NAME_LABEL)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
