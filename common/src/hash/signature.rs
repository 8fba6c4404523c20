use std::ops::Deref;

use xxhash_rust::xxh3::Xxh3;

use crate::label::{Label, METRIC_NAME_LABEL, SEP};

/// Hash of a label set. Used as the identity of a series and as the key of
/// aggregation and vector-matching groups.
#[derive(Debug, Default, Clone, PartialEq, Eq, Copy, Ord, PartialOrd, Hash)]
pub struct Signature(u64);

impl Deref for Signature {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

const EMPTY_LIST_SIGNATURE: u64 = 0x9e3779b97f4a7c15;

impl Signature {
    pub fn new(s: &str) -> Signature {
        let mut hasher = Xxh3::new();
        hasher.update(s.as_bytes());
        Signature(hasher.digest())
    }

    /// Hashes every label in `iter`. Labels are expected to be sorted by name.
    pub fn from_labels<'a>(iter: impl Iterator<Item = &'a Label>) -> Self {
        let mut hasher = Xxh3::new();
        let mut has_labels = false;
        for label in iter {
            write_label(&mut hasher, label);
            has_labels = true;
        }
        if !has_labels {
            return Signature(EMPTY_LIST_SIGNATURE);
        }
        Signature(hasher.digest())
    }

    /// Hashes only the labels whose names are in `names`.
    pub fn from_labels_on<'a>(iter: impl Iterator<Item = &'a Label>, names: &[String]) -> Self {
        Self::from_labels(iter.filter(|l| names.iter().any(|n| n == &l.name)))
    }

    /// Hashes every label except the metric name and the labels in `names`.
    pub fn from_labels_ignoring<'a>(
        iter: impl Iterator<Item = &'a Label>,
        names: &[String],
    ) -> Self {
        Self::from_labels(
            iter.filter(|l| l.name != METRIC_NAME_LABEL && !names.iter().any(|n| n == &l.name)),
        )
    }
}

fn write_label(hasher: &mut Xxh3, label: &Label) {
    hasher.update(label.name.as_bytes());
    hasher.update(&[SEP]);
    hasher.update(label.value.as_bytes());
    hasher.update(&[SEP]);
}

impl From<Signature> for u64 {
    fn from(sig: Signature) -> Self {
        sig.0
    }
}

impl From<u64> for Signature {
    fn from(sig: u64) -> Self {
        Signature(sig)
    }
}
