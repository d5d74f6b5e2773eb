//! Shared error taxonomy for the log-store boundary (§7).
//!
//! Downstream crates (`crablet-exec`, `crablet-outbox`) define their own
//! error enums and fold a [`CoreError`] in via `#[from]`, the way the
//! teacher threads `StoreError` up through `ExecError`/`DaemonError`.

use thiserror::Error;

/// Why a [`CoreError::Concurrency`] fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyKind {
    /// `stateChanged` matched an event past `afterCursor`: the caller's
    /// decision state is stale.
    Stale,
    /// `alreadyExists` matched an event: this is a duplicate operation.
    /// Carries the classifying reason string (e.g. `"DUPLICATE_OPERATION"`).
    Duplicate(String),
}

/// Errors raised by the log store (§4.1) and surfaced through the executor.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed event (empty type, null tag key) — §4.1 validation rules.
    #[error("validation error: {0}")]
    Validation(String),

    /// `appendIf`'s condition was violated.
    #[error("concurrency error: {kind:?}")]
    Concurrency { kind: ConcurrencyKind },

    /// Infrastructure failure (I/O, database).
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl CoreError {
    pub fn stale() -> Self {
        Self::Concurrency { kind: ConcurrencyKind::Stale }
    }

    pub fn duplicate(reason: impl Into<String>) -> Self {
        Self::Concurrency { kind: ConcurrencyKind::Duplicate(reason.into()) }
    }

    /// The classifying reason if this is a duplicate-operation conflict,
    /// used by the executor to decide whether to reclassify as
    /// `Idempotent` rather than propagate (§4.4 step 6).
    pub fn duplicate_reason(&self) -> Option<&str> {
        match self {
            Self::Concurrency { kind: ConcurrencyKind::Duplicate(reason) } => Some(reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
