//! Append conditions: the heart of the dynamic consistency boundary (§4.4).

use crate::cursor::Cursor;
use crate::query::Query;
use serde::{Deserialize, Serialize};

/// The condition an `appendIf` call must verify before committing its
/// events. See §4.4 for the full staleness/duplicate semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendCondition {
    /// The cursor the caller's decision state was projected up to.
    pub after_cursor: Cursor,
    /// Staleness check: no event matching this query may exist past
    /// `after_cursor`.
    pub state_changed: Query,
    /// Optional idempotency check: no event matching this query may exist
    /// at any position.
    pub already_exists: Option<Query>,
}

impl AppendCondition {
    /// An unconditional append: no staleness check, no duplicate check.
    /// Per §9's open-question resolution, this appends unconditionally
    /// under the transaction id.
    pub fn unconditional() -> Self {
        Self { after_cursor: Cursor::zero(), state_changed: Query::match_all(), already_exists: None }
    }

    pub fn new(after_cursor: Cursor, state_changed: Query) -> Self {
        Self { after_cursor, state_changed, already_exists: None }
    }

    pub fn with_already_exists(mut self, query: Query) -> Self {
        self.already_exists = Some(query);
        self
    }

    /// True when this condition imposes no constraint at all — the
    /// "unconditional append" case from §9.
    pub fn is_unconstrained(&self) -> bool {
        self.state_changed.items.is_empty() && self.already_exists.is_none()
    }
}
