//! Query language: tag/type filters over the event log (§4.2).

use crate::tags::{Tag, TagPredicate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One disjunct of a [`Query`]. An event matches an item when its type is
/// in `event_types` (or `event_types` is empty) AND every predicate in
/// `tag_predicates` is satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    pub event_types: BTreeSet<String>,
    pub tag_predicates: Vec<TagPredicate>,
}

impl QueryItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types.insert(event_type.into());
        self
    }

    pub fn with_event_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.event_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tag_predicates.push(TagPredicate::new(key, value));
        self
    }

    fn matches(&self, event_type: &str, tags: &[Tag]) -> bool {
        let type_ok = self.event_types.is_empty() || self.event_types.contains(event_type);
        type_ok && self.tag_predicates.iter().all(|p| p.is_satisfied_by(tags))
    }
}

/// A query: the disjunction (`OR`) of its items. The empty query (no
/// items) matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub items: Vec<QueryItem>,
}

impl Query {
    /// The query that matches every event.
    pub fn match_all() -> Self {
        Self { items: Vec::new() }
    }

    pub fn new(items: Vec<QueryItem>) -> Self {
        Self { items }
    }

    pub fn of(item: QueryItem) -> Self {
        Self { items: vec![item] }
    }

    /// Does `event_type`/`tags` satisfy this query?
    pub fn matches(&self, event_type: &str, tags: &[Tag]) -> bool {
        self.items.is_empty() || self.items.iter().any(|item| item.matches(event_type, tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Vec<Tag> {
        pairs.iter().map(|(k, v)| Tag::new(*k, *v).unwrap()).collect()
    }

    #[test]
    fn empty_query_matches_everything() {
        let q = Query::match_all();
        assert!(q.matches("AnyType", &tags(&[])));
        assert!(q.matches("AnyType", &tags(&[("a", "b")])));
    }

    #[test]
    fn item_requires_type_and_all_predicates() {
        let item = QueryItem::new()
            .with_event_type("WalletOpened")
            .with_tag("wallet_id", "W1");
        let q = Query::of(item);

        assert!(q.matches("WalletOpened", &tags(&[("wallet_id", "W1")])));
        assert!(!q.matches("WalletOpened", &tags(&[("wallet_id", "W2")])));
        assert!(!q.matches("OtherType", &tags(&[("wallet_id", "W1")])));
    }

    #[test]
    fn items_are_ored() {
        let q = Query::new(vec![
            QueryItem::new().with_event_type("A"),
            QueryItem::new().with_event_type("B"),
        ]);
        assert!(q.matches("A", &tags(&[])));
        assert!(q.matches("B", &tags(&[])));
        assert!(!q.matches("C", &tags(&[])));
    }

    #[test]
    fn repeated_key_predicates_are_anded() {
        // two predicates under the same key effectively require two tags
        let item = QueryItem::new().with_tag("k", "1").with_tag("k", "2");
        let q = Query::of(item);
        assert!(!q.matches("T", &tags(&[("k", "1")])));
        assert!(q.matches("T", &tags(&[("k", "1"), ("k", "2")])));
    }

    #[test]
    fn empty_event_types_means_any_type() {
        let item = QueryItem::new().with_tag("wallet_id", "W1");
        let q = Query::of(item);
        assert!(q.matches("Whatever", &tags(&[("wallet_id", "W1")])));
    }
}
