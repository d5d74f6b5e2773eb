//! Topic routing: which subset of the log a topic fans out (§4.5).

use crablet_core::Tag;
use std::collections::{BTreeMap, BTreeSet};

/// A named subset of the log. An event matches iff every `required_tags`
/// key is present, at least one `any_of_tags` key is present (when the set
/// is non-empty), and every `exact_tags` pair matches exactly. An empty
/// config matches everything.
#[derive(Debug, Clone, Default)]
pub struct TopicConfig {
    pub required_tags: BTreeSet<String>,
    pub any_of_tags: BTreeSet<String>,
    pub exact_tags: BTreeMap<String, String>,
}

impl TopicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_tag(mut self, key: impl Into<String>) -> Self {
        self.required_tags.insert(key.into());
        self
    }

    pub fn any_of_tag(mut self, key: impl Into<String>) -> Self {
        self.any_of_tags.insert(key.into());
        self
    }

    pub fn exact_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.exact_tags.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, tags: &[Tag]) -> bool {
        let has_key = |key: &str| tags.iter().any(|t| t.key == key);

        let required_ok = self.required_tags.iter().all(|k| has_key(k));
        let any_of_ok = self.any_of_tags.is_empty() || self.any_of_tags.iter().any(|k| has_key(k));
        let exact_ok = self
            .exact_tags
            .iter()
            .all(|(k, v)| tags.iter().any(|t| &t.key == k && &t.value == v));

        required_ok && any_of_ok && exact_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<Tag> {
        pairs.iter().map(|(k, v)| Tag::new(*k, *v).unwrap()).collect()
    }

    #[test]
    fn empty_config_matches_everything() {
        let topic = TopicConfig::new();
        assert!(topic.matches(&tags(&[])));
        assert!(topic.matches(&tags(&[("wallet_id", "W1")])));
    }

    #[test]
    fn required_tags_must_all_be_present() {
        let topic = TopicConfig::new().require_tag("wallet_id").require_tag("account_id");
        assert!(!topic.matches(&tags(&[("wallet_id", "W1")])));
        assert!(topic.matches(&tags(&[("wallet_id", "W1"), ("account_id", "A1")])));
    }

    #[test]
    fn any_of_tags_needs_one_match() {
        let topic = TopicConfig::new().any_of_tag("wallet_id").any_of_tag("account_id");
        assert!(!topic.matches(&tags(&[("order_id", "O1")])));
        assert!(topic.matches(&tags(&[("account_id", "A1")])));
    }

    #[test]
    fn exact_tags_require_value_match() {
        let topic = TopicConfig::new().exact_tag("currency", "USD");
        assert!(!topic.matches(&tags(&[("currency", "EUR")])));
        assert!(topic.matches(&tags(&[("currency", "USD")])));
    }
}
