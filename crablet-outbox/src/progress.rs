//! Per-(topic, publisher) progress and the status state machine (§4.5, §6).

use chrono::{DateTime, Utc};

/// Status of one (topic, publisher) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum OutboxStatus {
    Active,
    Paused,
    Failed,
}

impl OutboxStatus {
    /// `FAILED`/`PAUSED` pairs are skipped by the processing cycle.
    pub fn is_processable(self) -> bool {
        matches!(self, OutboxStatus::Active)
    }
}

/// Progress row for one (topic, publisher) pair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxProgress {
    pub topic: String,
    pub publisher: String,
    pub last_position: i64,
    pub status: OutboxStatus,
    pub error_count: i32,
    pub last_error: Option<String>,
    pub leader_instance: Option<String>,
    pub leader_heartbeat: Option<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OutboxProgress {
    /// A fresh row as inserted on first observation of a pair (§4.5).
    pub fn new(topic: impl Into<String>, publisher: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            topic: topic.into(),
            publisher: publisher.into(),
            last_position: 0,
            status: OutboxStatus::Active,
            error_count: 0,
            last_error: None,
            leader_instance: None,
            leader_heartbeat: None,
            last_published_at: None,
            updated_at: now,
            created_at: now,
        }
    }
}
