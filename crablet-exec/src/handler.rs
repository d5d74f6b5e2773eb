//! Command handlers: the decision logic the executor drives (§4.4).
//!
//! Handlers are registered explicitly by `command_type()` — no reflection,
//! no naming convention the executor has to guess at (REDESIGN FLAGS §9).

use crate::error::ExecError;
use async_trait::async_trait;
use crablet_core::CommandResult;
use crablet_eventlog::TransactionalStore;

/// One command's decision logic: project the state it needs, decide, and
/// return the events to append plus the condition to append them under.
///
/// Handlers must not call `append_if` themselves — the executor applies
/// the returned condition after `handle` returns. The transactional store
/// handle exposes `append_if` anyway (discouraged, not forbidden) for
/// handlers that need to record something outside the normal flow; the
/// executor's own append still runs afterward regardless.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// The `type` field value this handler answers to.
    fn command_type(&self) -> &'static str;

    /// Decide what to do with `command`, reading through `tx` as needed.
    async fn handle(
        &self,
        tx: &mut dyn TransactionalStore,
        command: &serde_json::Value,
    ) -> Result<CommandResult, ExecError>;
}
