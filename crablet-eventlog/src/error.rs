//! Event log error taxonomy: folds [`CoreError`] in via `#[from]` and adds
//! the I/O failures specific to the Postgres backend.

use crablet_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl EventLogError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, EventLogError::Core(CoreError::Concurrency { .. }))
    }
}

pub type Result<T> = std::result::Result<T, EventLogError>;
