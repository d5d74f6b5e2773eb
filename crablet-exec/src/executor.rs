//! The Command Executor (§4.4): the transactional envelope around
//! project → decide → append.

use crate::error::ExecError;
use crate::handler::CommandHandler;
use crablet_core::{ConcurrencyKind, CoreError, ExecutionResult, NewEvent, Tag};
use crablet_eventlog::{LogStore, TransactionalStore};
use std::collections::HashMap;
use tracing::{info, warn};

/// When set, the executor appends a `_CommandRecorded` event alongside the
/// handler's own events, in the same transaction, carrying the raw command
/// envelope. This is the append-only equivalent of a separate `commands`
/// audit table (§6) — one log, no second write path to keep consistent.
const COMMAND_RECORDED_TYPE: &str = "_CommandRecorded";

/// Drives registered [`CommandHandler`]s against a [`LogStore`]. Generic
/// over the backend rather than boxed, so a test suite can swap in
/// `MemoryLogStore` for a `PostgresLogStore`-backed production executor
/// without any trait-object overhead.
pub struct Executor<L: LogStore> {
    store: L,
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
    persist_commands: bool,
}

impl<L: LogStore> Executor<L> {
    /// Build an executor over `store` with the given handler set.
    /// Fails if two handlers claim the same `command_type()` — a wiring
    /// bug, caught once at startup rather than at call time.
    pub fn new(store: L, handlers: Vec<Box<dyn CommandHandler>>) -> Result<Self, ExecError> {
        let mut map = HashMap::with_capacity(handlers.len());
        for handler in handlers {
            let command_type = handler.command_type();
            if map.insert(command_type, handler).is_some() {
                return Err(ExecError::DuplicateHandler(command_type.to_string()));
            }
        }
        Ok(Self { store, handlers: map, persist_commands: false })
    }

    /// The underlying store, for callers that need to query the log
    /// directly (read models, tests) rather than through a handler.
    pub fn store(&self) -> &L {
        &self.store
    }

    /// Also append a `_CommandRecorded` audit event for every executed
    /// command, in the same transaction as its decision.
    pub fn with_command_persistence(mut self) -> Self {
        self.persist_commands = true;
        self
    }

    /// Execute `command`, an envelope shaped `{"type": "...", ...}`.
    pub async fn execute(&self, command: serde_json::Value) -> Result<ExecutionResult, ExecError> {
        let command_type = command
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(ExecError::MissingCommandType)?
            .to_string();

        let handler = self
            .handlers
            .get(command_type.as_str())
            .ok_or_else(|| ExecError::UnknownCommandType(command_type.clone()))?;

        let persist_commands = self.persist_commands;
        let result = self
            .store
            .execute_in_transaction::<_, ExecutionResult, ExecError>(move |tx| {
                Box::pin(run_handler(handler.as_ref(), tx, command, command_type, persist_commands))
            })
            .await;

        match &result {
            Ok(ExecutionResult::Created(n)) => info!(events = n, "command executed"),
            Ok(ExecutionResult::Idempotent(reason)) => info!(%reason, "command was a no-op replay"),
            Err(ExecError::Core(CoreError::Concurrency { kind })) => {
                warn!(?kind, "command rejected by concurrency check")
            }
            Err(_) => {}
        }
        result
    }
}

async fn run_handler<'h>(
    handler: &'h dyn CommandHandler,
    tx: &'h mut dyn TransactionalStore,
    command: serde_json::Value,
    command_type: String,
    persist_commands: bool,
) -> Result<ExecutionResult, ExecError> {
    let decision = handler.handle(tx, &command).await?;

    if decision.is_idempotent_noop() {
        return Ok(ExecutionResult::Idempotent(decision.idempotency_reason.unwrap_or_default()));
    }

    let mut events = decision.events;
    if persist_commands {
        events.push(NewEvent::json(
            COMMAND_RECORDED_TYPE,
            vec![Tag::new("command_type", command_type).expect("command_type is non-empty")],
            &command,
        )?);
    }

    let n = events.len();
    match tx.append_if(events, decision.condition).await {
        Ok(_) => Ok(ExecutionResult::Created(n)),
        // The `alreadyExists` branch fired: this is a replay, not a conflict
        // — reclassify rather than surface as a concurrency error (§4.4).
        Err(CoreError::Concurrency { kind: ConcurrencyKind::Duplicate(reason) }) => {
            Ok(ExecutionResult::Idempotent(reason))
        }
        Err(e) => Err(e.into()),
    }
}

impl From<serde_json::Error> for ExecError {
    fn from(e: serde_json::Error) -> Self {
        ExecError::InvalidHandlerResult(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crablet_core::{AppendCondition, CommandResult, Cursor, Query, QueryItem};
    use crablet_eventlog::MemoryLogStore;
    use serde_json::json;

    struct OpenWallet;

    #[async_trait::async_trait]
    impl CommandHandler for OpenWallet {
        fn command_type(&self) -> &'static str {
            "OpenWallet"
        }

        async fn handle(
            &self,
            tx: &mut dyn TransactionalStore,
            command: &serde_json::Value,
        ) -> Result<CommandResult, ExecError> {
            let wallet_id = command["wallet_id"].as_str().unwrap().to_string();
            let query = Query::of(
                QueryItem::new().with_event_type("WalletOpened").with_tag("wallet_id", &wallet_id),
            );
            let existing = tx.query(&query, None).await?;
            if !existing.is_empty() {
                return Ok(CommandResult::idempotent("wallet already open"));
            }
            let event = NewEvent::json(
                "WalletOpened",
                vec![Tag::new("wallet_id", wallet_id).unwrap()],
                &json!({}),
            )?;
            Ok(CommandResult::created(vec![event], AppendCondition::new(Cursor::zero(), query)))
        }
    }

    fn executor() -> Executor<MemoryLogStore> {
        Executor::new(MemoryLogStore::new(), vec![Box::new(OpenWallet)]).unwrap()
    }

    #[tokio::test]
    async fn executes_and_appends() {
        let exec = executor();
        let result = exec.execute(json!({"type": "OpenWallet", "wallet_id": "W1"})).await.unwrap();
        assert_eq!(result, ExecutionResult::Created(1));
    }

    #[tokio::test]
    async fn second_identical_command_is_idempotent() {
        let exec = executor();
        exec.execute(json!({"type": "OpenWallet", "wallet_id": "W1"})).await.unwrap();
        let result = exec.execute(json!({"type": "OpenWallet", "wallet_id": "W1"})).await.unwrap();
        assert_eq!(result, ExecutionResult::Idempotent("wallet already open".to_string()));
    }

    #[tokio::test]
    async fn unknown_command_type_is_rejected() {
        let exec = executor();
        let err = exec.execute(json!({"type": "NoSuchCommand"})).await.unwrap_err();
        assert!(matches!(err, ExecError::UnknownCommandType(_)));
    }

    #[tokio::test]
    async fn duplicate_handler_registration_fails_at_construction() {
        let err =
            Executor::new(MemoryLogStore::new(), vec![Box::new(OpenWallet), Box::new(OpenWallet)])
                .unwrap_err();
        assert!(matches!(err, ExecError::DuplicateHandler(_)));
    }
}
