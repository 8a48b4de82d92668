//! Metric identity
//!
//! A [`MetricKey`] is a name plus an optional qualifier (the call site or any
//! explicit suffix). Both are folded into a single lookup identity
//! `name/suffix` when the key is built, so the hot path hashes one string.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::constants::SUFFIX_SEPARATOR;

/// Immutable identity of one counter or gauge.
///
/// Equality and hashing only consider the composed identity, which makes a
/// `HashMap<MetricKey, _>` searchable by `&str`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct MetricKey {
    identity: String,
    name_len: usize,
}

impl MetricKey {
    /// Key without a suffix; the identity is the name itself.
    pub fn new(name: impl Into<String>) -> Self {
        let identity = name.into();
        let name_len = identity.len();
        Self { identity, name_len }
    }

    /// Key qualified by `suffix`. An empty suffix yields the same key as
    /// [`MetricKey::new`].
    pub fn with_suffix(name: impl AsRef<str>, suffix: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let suffix = suffix.as_ref();
        if suffix.is_empty() {
            return Self::new(name);
        }

        let mut identity = String::with_capacity(name.len() + suffix.len() + 1);
        identity.push_str(name);
        identity.push(SUFFIX_SEPARATOR);
        identity.push_str(suffix);
        Self { identity, name_len: name.len() }
    }

    /// The metric name without its suffix.
    pub fn name(&self) -> &str {
        &self.identity[..self.name_len]
    }

    /// The suffix, if one was supplied.
    pub fn suffix(&self) -> Option<&str> {
        if self.name_len < self.identity.len() {
            Some(&self.identity[self.name_len + SUFFIX_SEPARATOR.len_utf8()..])
        } else {
            None
        }
    }

    /// The composed lookup identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn into_identity(self) -> String {
        self.identity
    }
}

impl PartialEq for MetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for MetricKey {}

impl Hash for MetricKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl PartialOrd for MetricKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.identity.cmp(&other.identity)
    }
}

impl Borrow<str> for MetricKey {
    fn borrow(&self) -> &str {
        &self.identity
    }
}

impl AsRef<str> for MetricKey {
    fn as_ref(&self) -> &str {
        &self.identity
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

impl From<&str> for MetricKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MetricKey {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<(&str, &str)> for MetricKey {
    fn from((name, suffix): (&str, &str)) -> Self {
        Self::with_suffix(name, suffix)
    }
}

impl From<MetricKey> for String {
    fn from(key: MetricKey) -> Self {
        key.identity
    }
}
