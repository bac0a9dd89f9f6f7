//! Label sets and subset matching.
//!
//! Alerts are identified by their labels. The same logical alert can be
//! recorded with fewer labels at grouping time than it carries live (no
//! `pod`, no cluster id), so identity is tested with a subset match rather
//! than equality.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered set of label name/value pairs.
///
/// Keys are kept sorted so the [`Display`](fmt::Display) form is canonical
/// and can be used as a deduplication key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Creates an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds a label and returns self for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts a label, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Removes a label, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    /// Renames a label if present. An existing label under `to` is overwritten.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(value) = self.0.remove(from) {
            self.0.insert(to.to_string(), value);
        }
    }

    /// Returns the value of a label.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the value of a label, or the empty string when absent.
    #[must_use]
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// Returns true if the label is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates labels in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if every label in `self` is present in `other` with an
    /// equal value. `other` may carry extra labels.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.0
            .iter()
            .all(|(k, v)| other.0.get(k).is_some_and(|ov| ov == v))
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for LabelSet {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// Tests candidate label sets against a reference label set.
///
/// A candidate matches when it contains every reference label with the same
/// value. Used both to find the live instances of a recorded alert and to
/// check a live alert against the silence list.
#[derive(Debug, Clone, Copy)]
pub struct LabelMatcher<'a> {
    reference: &'a LabelSet,
}

impl<'a> LabelMatcher<'a> {
    /// Creates a matcher for the given reference labels.
    #[must_use]
    pub const fn new(reference: &'a LabelSet) -> Self {
        Self { reference }
    }

    /// Returns true if `candidate` carries all reference labels.
    #[must_use]
    pub fn matches(&self, candidate: &LabelSet) -> bool {
        self.reference.is_subset_of(candidate)
    }

    /// Returns true if any of `references` matches `candidate`.
    pub fn any<'r, I>(references: I, candidate: &LabelSet) -> bool
    where
        I: IntoIterator<Item = &'r LabelSet>,
    {
        references
            .into_iter()
            .any(|r| LabelMatcher::new(r).matches(candidate))
    }
}
