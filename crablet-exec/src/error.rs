//! Execution layer error types.

use crablet_core::CoreError;
use thiserror::Error;

/// Errors that can occur during command execution.
#[derive(Debug, Error)]
pub enum ExecError {
    /// No handler registered under this `type` field.
    #[error("no handler registered for command type {0:?}")]
    UnknownCommandType(String),

    /// The command envelope had no usable `type` field.
    #[error("command is missing a string \"type\" field")]
    MissingCommandType,

    /// `Executor::new` was given two handlers claiming the same
    /// `command_type()` — a wiring bug, not a runtime condition.
    #[error("duplicate handler registered for command type {0:?}")]
    DuplicateHandler(String),

    /// The handler returned a result that cannot be applied (e.g. both
    /// `events` and an `idempotency_reason` set).
    #[error("handler returned an invalid result: {0}")]
    InvalidHandlerResult(String),

    /// A handler-level business rule rejected the command (distinct from
    /// a concurrency conflict, which is [`ExecError::Core`]).
    #[error("command rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ExecResult<T> = Result<T, ExecError>;
