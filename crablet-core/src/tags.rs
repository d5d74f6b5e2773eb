//! Tags: the `(key, value)` pairs attached to every event.
//!
//! Serialized to the sorted `"key=value"` string-array form (§6 of the
//! core spec): the source repository's primary (non-legacy) scheme. The
//! legacy `key:value` form is intentionally not supported here.

use serde::{Deserialize, Serialize};

/// A single `(key, value)` tag on an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    /// Construct a tag, rejecting an empty key.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, TagError> {
        let key = key.into();
        if key.is_empty() {
            return Err(TagError::EmptyKey);
        }
        Ok(Self { key, value: value.into() })
    }

    /// Render as the `"key=value"` wire form.
    pub fn to_db_string(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// Parse the `"key=value"` wire form. Splits on the first `=`.
    pub fn from_db_string(s: &str) -> Option<Self> {
        let (key, value) = s.split_once('=')?;
        if key.is_empty() {
            return None;
        }
        Some(Self { key: key.to_string(), value: value.to_string() })
    }
}

/// Errors constructing a [`Tag`].
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("tag key must not be empty")]
    EmptyKey,
}

/// Serialize a tag list to the sorted `"key=value"` array stored in the
/// `events.tags` column, per §6.
pub fn to_db_array(tags: &[Tag]) -> Vec<String> {
    let mut rendered: Vec<String> = tags.iter().map(Tag::to_db_string).collect();
    rendered.sort();
    rendered
}

/// Parse the sorted `"key=value"` array back into tags. Malformed entries
/// (missing `=`, empty key) are dropped rather than failing the whole read —
/// they should never occur for events this store wrote itself.
pub fn from_db_array(raw: &[String]) -> Vec<Tag> {
    raw.iter().filter_map(|s| Tag::from_db_string(s)).collect()
}

/// A predicate matched against an event's tag list: satisfied when the
/// event carries a tag with this exact `(key, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPredicate {
    pub key: String,
    pub value: String,
}

impl TagPredicate {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Does `tags` contain a pair matching this predicate?
    pub fn is_satisfied_by(&self, tags: &[Tag]) -> bool {
        tags.iter().any(|t| t.key == self.key && t.value == self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(Tag::new("", "x"), Err(TagError::EmptyKey)));
    }

    #[test]
    fn allows_empty_value() {
        let tag = Tag::new("wallet_id", "").unwrap();
        assert_eq!(tag.to_db_string(), "wallet_id=");
    }

    #[test]
    fn db_array_round_trips_and_sorts() {
        let tags = vec![
            Tag::new("wallet_id", "W2").unwrap(),
            Tag::new("account", "A1").unwrap(),
        ];
        let rendered = to_db_array(&tags);
        assert_eq!(rendered, vec!["account=A1", "wallet_id=W2"]);

        let parsed = from_db_array(&rendered);
        assert_eq!(parsed.len(), 2);
        assert!(parsed.contains(&Tag::new("wallet_id", "W2").unwrap()));
    }

    #[test]
    fn predicate_requires_exact_match() {
        let tags = vec![Tag::new("wallet_id", "W1").unwrap()];
        assert!(TagPredicate::new("wallet_id", "W1").is_satisfied_by(&tags));
        assert!(!TagPredicate::new("wallet_id", "W2").is_satisfied_by(&tags));
        assert!(!TagPredicate::new("account", "W1").is_satisfied_by(&tags));
    }
}
