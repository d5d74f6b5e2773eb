//! Outbox error types (§4.5, §7).

use crablet_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// The circuit for this publisher is open; the call was never attempted.
    #[error("circuit open for publisher {0:?}")]
    CircuitOpen(String),

    /// A publisher's `publish_batch` returned an error.
    #[error("publish to {publisher:?} failed: {reason}")]
    PublishFailed { publisher: String, reason: String },

    /// Configuration references a publisher or topic name that isn't wired up.
    #[error("unknown {0}")]
    UnknownBinding(String),
}

pub type Result<T> = std::result::Result<T, OutboxError>;
