//! Compiles a [`Query`] into a Postgres `WHERE` fragment over the `events`
//! table (§4.2). `tags` is stored as the sorted `"key=value"` text array
//! from §6 of the core spec, so a tag predicate becomes a `tags @> ARRAY[..]`
//! containment check and a type predicate becomes `event_type = ANY(..)`.
//!
//! [`crate::memory::evaluate`] implements the identical semantics
//! in-process by delegating to [`crablet_core::Query::matches`] directly,
//! so the two can't silently diverge on what a query means — only on how
//! it's executed.

use crablet_core::{tags, Query};
use std::fmt::Write as _;

/// A compiled query: the `WHERE` fragment (sans leading `AND`/`WHERE`) plus
/// the bind values, in order, that go with its `$n` placeholders.
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<Bind>,
}

/// One bind value. Kept as an enum rather than `Box<dyn Encode>` so the
/// caller can match and `.bind()` each variant onto a `sqlx::query_as`
/// builder without dynamic dispatch into `sqlx`'s encode machinery.
pub enum Bind {
    Text(String),
    TextArray(Vec<String>),
}

/// Compile `query` starting bind numbering at `$start` (1-based, so the
/// caller can prepend its own fixed binds like `after_position`).
pub fn compile(query: &Query, start: usize) -> CompiledQuery {
    if query.items.is_empty() {
        return CompiledQuery { sql: "TRUE".to_string(), binds: Vec::new() };
    }

    let mut sql = String::new();
    let mut binds = Vec::new();
    let mut next = start;

    sql.push('(');
    for (i, item) in query.items.iter().enumerate() {
        if i > 0 {
            sql.push_str(" OR ");
        }
        sql.push('(');
        let mut first_clause = true;

        if !item.event_types.is_empty() {
            let types: Vec<String> = item.event_types.iter().cloned().collect();
            write!(sql, "event_type = ANY(${})", next).unwrap();
            binds.push(Bind::TextArray(types));
            next += 1;
            first_clause = false;
        }

        for predicate in &item.tag_predicates {
            if !first_clause {
                sql.push_str(" AND ");
            }
            let tag = tags::Tag::new(predicate.key.clone(), predicate.value.clone())
                .expect("query predicate key was validated at construction");
            write!(sql, "tags @> ARRAY[${}]", next).unwrap();
            binds.push(Bind::Text(tag.to_db_string()));
            next += 1;
            first_clause = false;
        }

        if first_clause {
            sql.push_str("TRUE");
        }
        sql.push(')');
    }
    sql.push(')');

    CompiledQuery { sql, binds }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crablet_core::QueryItem;

    #[test]
    fn empty_query_compiles_to_true() {
        let compiled = compile(&Query::match_all(), 1);
        assert_eq!(compiled.sql, "TRUE");
        assert!(compiled.binds.is_empty());
    }

    #[test]
    fn single_item_ands_type_and_tags() {
        let item = QueryItem::new().with_event_type("WalletOpened").with_tag("wallet_id", "W1");
        let compiled = compile(&Query::of(item), 2);
        assert_eq!(compiled.sql, "((event_type = ANY($2) AND tags @> ARRAY[$3]))");
        assert_eq!(compiled.binds.len(), 2);
    }

    #[test]
    fn multiple_items_are_ored() {
        let q = Query::new(vec![
            QueryItem::new().with_event_type("A"),
            QueryItem::new().with_event_type("B"),
        ]);
        let compiled = compile(&q, 1);
        assert_eq!(compiled.sql, "((event_type = ANY($1)) OR (event_type = ANY($2)))");
    }
}
