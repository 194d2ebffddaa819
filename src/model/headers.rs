//! Ordered header mapping written to `headers.yaml` and delivery-status files.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Policy for header names that occur more than once in one block
/// (e.g. several `Received` lines).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatedHeaders {
    /// Keep the position of the first occurrence and the value of the last.
    #[default]
    Last,
    /// Keep every value, in order, as a sequence.
    All,
}

/// A header value: a single string, or every value of a repeated header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// The most recent value.
    pub fn last(&self) -> &str {
        match self {
            Self::Single(v) => v,
            Self::Multiple(values) => values.last().map(String::as_str).unwrap_or(""),
        }
    }
}

/// Header fields keyed by name, ordered by first appearance.
///
/// Names keep their original spelling; lookups with [`HeaderMap::get`] are
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderMap {
    fields: IndexMap<String, HeaderValue>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, resolving repeats according to `policy`.
    pub fn insert(&mut self, name: String, value: String, policy: RepeatedHeaders) {
        match (self.fields.get_mut(&name), policy) {
            (None, _) => {
                self.fields.insert(name, HeaderValue::Single(value));
            }
            (Some(existing), RepeatedHeaders::Last) => {
                *existing = HeaderValue::Single(value);
            }
            (Some(HeaderValue::Multiple(values)), RepeatedHeaders::All) => values.push(value),
            (Some(existing), RepeatedHeaders::All) => {
                let first = existing.last().to_string();
                *existing = HeaderValue::Multiple(vec![first, value]);
            }
        }
    }

    /// Last value of the first field whose name matches case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.last())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs in appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
