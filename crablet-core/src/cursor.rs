//! Cursor: a pointer into the log (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in the log. Two cursors are equal iff all three fields match.
/// `Cursor::zero()` means "before any event."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub position: u64,
    pub occurred_at: DateTime<Utc>,
    pub transaction_id: String,
}

impl Cursor {
    /// The zero cursor: "from the beginning."
    pub fn zero() -> Self {
        Self { position: 0, occurred_at: DateTime::<Utc>::UNIX_EPOCH, transaction_id: String::new() }
    }

    pub fn is_zero(&self) -> bool {
        self.position == 0
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::zero()
    }
}
