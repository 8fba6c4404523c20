use std::cmp::Ordering;
use std::fmt;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use promfix_common::format::quote;
use promfix_common::hash::Signature;
use promfix_common::label::{Label, METRIC_NAME_LABEL};

/// The label set identifying a series. Labels are kept sorted by name and
/// names are unique. Empty values are never stored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName {
    labels: Vec<Label>,
}

impl MetricName {
    pub fn new(name: &str) -> Self {
        let mut mn = MetricName::default();
        mn.set_metric_name(name);
        mn
    }

    /// Builds a label set from arbitrary labels. Later labels win over
    /// earlier ones with the same name.
    pub fn from_labels<I: IntoIterator<Item = Label>>(labels: I) -> Self {
        let mut mn = MetricName::default();
        for label in labels {
            mn.set_label(&label.name, &label.value);
        }
        mn
    }

    pub fn from_strings(pairs: &[(&str, &str)]) -> Self {
        Self::from_labels(pairs.iter().map(|(n, v)| Label::new(*n, *v)))
    }

    pub fn metric_name(&self) -> Option<&str> {
        self.get(METRIC_NAME_LABEL)
    }

    pub fn set_metric_name(&mut self, value: &str) {
        self.set_label(METRIC_NAME_LABEL, value)
    }

    pub fn reset_metric_name(&mut self) {
        self.remove_label(METRIC_NAME_LABEL)
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.labels.binary_search_by(|l| l.name.as_str().cmp(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .ok()
            .map(|idx| self.labels[idx].value.as_str())
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.position(name).is_ok()
    }

    /// Sets `name` to `value`. An empty value removes the label.
    pub fn set_label(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.remove_label(name);
            return;
        }
        match self.position(name) {
            Ok(idx) => self.labels[idx].value = value.to_string(),
            Err(idx) => self.labels.insert(idx, Label::new(name, value)),
        }
    }

    pub fn remove_label(&mut self, name: &str) {
        if let Ok(idx) = self.position(name) {
            self.labels.remove(idx);
        }
    }

    /// Removes every label named in `names`.
    pub fn remove_labels(&mut self, names: &[String]) {
        self.labels.retain(|l| !names.contains(&l.name))
    }

    /// Keeps only the labels named in `names`.
    pub fn retain_labels(&mut self, names: &[String]) {
        self.labels.retain(|l| names.contains(&l.name))
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn signature(&self) -> Signature {
        Signature::from_labels(self.labels.iter())
    }

    /// Signature over the labels used for vector matching or grouping: only
    /// `names` when `on` is set, otherwise everything but `names` and the
    /// metric name.
    pub fn matching_signature(&self, on: bool, names: &[String]) -> Signature {
        if on {
            Signature::from_labels_on(self.labels.iter(), names)
        } else {
            Signature::from_labels_ignoring(self.labels.iter(), names)
        }
    }

    /// The labels `matching_signature` hashes, as a label set.
    pub fn matching_labels(&self, on: bool, names: &[String]) -> MetricName {
        let labels = self
            .labels
            .iter()
            .filter(|l| {
                if on {
                    names.contains(&l.name)
                } else {
                    !l.is_metric_name() && !names.contains(&l.name)
                }
            })
            .cloned()
            .collect();
        MetricName { labels }
    }
}

impl PartialOrd for MetricName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.labels.cmp(&other.labels)
    }
}

impl Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", label.name, quote(&label.value))?;
        }
        write!(f, "}}")
    }
}
