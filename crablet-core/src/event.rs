//! Event types: the caller-supplied form and the durable, position-bearing
//! form (§3).

use crate::tags::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An event as constructed by a command handler, before it has been
/// assigned a position or transaction id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub event_type: String,
    pub tags: Vec<Tag>,
    pub payload: Vec<u8>,
}

impl NewEvent {
    pub fn new(event_type: impl Into<String>, tags: Vec<Tag>, payload: Vec<u8>) -> Self {
        Self { event_type: event_type.into(), tags, payload }
    }

    /// Convenience constructor for a JSON payload.
    pub fn json(
        event_type: impl Into<String>,
        tags: Vec<Tag>,
        payload: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, tags, serde_json::to_vec(payload)?))
    }
}

/// An event as it is durably recorded in the log: immutable, ordered,
/// carrying the position/transaction_id/occurred_at the store assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub position: u64,
    pub transaction_id: String,
    pub event_type: String,
    pub tags: Vec<Tag>,
    pub payload: Vec<u8>,
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Deserialize this event's JSON payload into `T`.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// The cursor pointing immediately at this event.
    pub fn cursor(&self) -> crate::cursor::Cursor {
        crate::cursor::Cursor {
            position: self.position,
            occurred_at: self.occurred_at,
            transaction_id: self.transaction_id.clone(),
        }
    }
}
