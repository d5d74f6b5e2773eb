//! Command/execution result types (§3, §4.4).

use crate::condition::AppendCondition;
use crate::event::NewEvent;

/// What a command handler returns: events to append plus the condition
/// under which to append them.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub events: Vec<NewEvent>,
    pub condition: AppendCondition,
    /// Set when `events` is empty and this is a deliberate no-op replay.
    pub idempotency_reason: Option<String>,
}

impl CommandResult {
    pub fn created(events: Vec<NewEvent>, condition: AppendCondition) -> Self {
        Self { events, condition, idempotency_reason: None }
    }

    pub fn idempotent(reason: impl Into<String>) -> Self {
        Self { events: Vec::new(), condition: AppendCondition::unconditional(), idempotency_reason: Some(reason.into()) }
    }

    pub fn is_idempotent_noop(&self) -> bool {
        self.events.is_empty() && self.idempotency_reason.is_some()
    }
}

/// What `execute()` returns to the command producer (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// `n` new events were appended.
    Created(usize),
    /// The command was a replay of an already-recorded operation.
    Idempotent(String),
}
