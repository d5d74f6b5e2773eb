//! An in-memory [`LogStore`], used by unit tests that shouldn't need a
//! database (§8). A `Mutex`-guarded event vector plus a monotonic position
//! counter — one global position rather than a per-stream sequence.

use crate::store::{BoxFuture, LogStore, TransactionalStore};
use async_trait::async_trait;
use crablet_core::{AppendCondition, CoreError, Cursor, NewEvent, Query, StoredEvent};
use chrono::Utc;
use std::future::Future;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::validate::validate_new_events;

struct MemoryInner {
    events: Vec<StoredEvent>,
    next_position: u64,
}

/// Dependency-free [`LogStore`] backed by an in-process event vector.
pub struct MemoryLogStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(MemoryInner { events: Vec::new(), next_position: 0 }) }
    }

    /// Snapshot of every event currently stored, for test assertions.
    pub async fn all_events(&self) -> Vec<StoredEvent> {
        self.inner.lock().await.events.clone()
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate `query` against `events`, filtering to positions strictly after
/// `after`. Kept in lockstep with [`crate::query_sql::compile`] — see
/// `tests/query_parity.rs`.
pub fn evaluate(events: &[StoredEvent], query: &Query, after: Option<&Cursor>) -> Vec<StoredEvent> {
    let after_position = after.map(|c| c.position).unwrap_or(0);
    events
        .iter()
        .filter(|e| e.position > after_position && query.matches(&e.event_type, &e.tags))
        .cloned()
        .collect()
}

fn check_condition(events: &[StoredEvent], condition: &AppendCondition) -> Result<(), CoreError> {
    if condition.is_unconstrained() {
        return Ok(());
    }
    let stale = events.iter().any(|e| {
        e.position > condition.after_cursor.position
            && condition.state_changed.matches(&e.event_type, &e.tags)
    });
    if stale {
        return Err(CoreError::stale());
    }
    if let Some(already_exists) = &condition.already_exists {
        if let Some(dup) = events.iter().find(|e| already_exists.matches(&e.event_type, &e.tags)) {
            return Err(CoreError::duplicate(format!(
                "DUPLICATE_OPERATION: matched existing event at position {}",
                dup.position
            )));
        }
    }
    Ok(())
}

fn stamp(inner: &mut MemoryInner, transaction_id: &str, event: NewEvent) -> StoredEvent {
    inner.next_position += 1;
    StoredEvent {
        position: inner.next_position,
        transaction_id: transaction_id.to_string(),
        event_type: event.event_type,
        tags: event.tags,
        payload: event.payload,
        occurred_at: Utc::now(),
    }
}

impl LogStore for MemoryLogStore {
    async fn append(&self, events: Vec<NewEvent>) -> Result<Vec<StoredEvent>, CoreError> {
        self.append_if(events, AppendCondition::unconditional()).await
    }

    async fn append_if(
        &self,
        events: Vec<NewEvent>,
        condition: AppendCondition,
    ) -> Result<Vec<StoredEvent>, CoreError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        validate_new_events(&events)?;
        let mut inner = self.inner.lock().await;
        check_condition(&inner.events, &condition)?;
        let transaction_id = format!("mem-{}", Uuid::new_v4());
        let stored: Vec<StoredEvent> =
            events.into_iter().map(|e| stamp(&mut inner, &transaction_id, e)).collect();
        inner.events.extend(stored.clone());
        Ok(stored)
    }

    async fn query(
        &self,
        query: &Query,
        after: Option<&Cursor>,
    ) -> Result<Vec<StoredEvent>, CoreError> {
        let inner = self.inner.lock().await;
        Ok(evaluate(&inner.events, query, after))
    }

    async fn execute_in_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'h> FnOnce(&'h mut dyn TransactionalStore) -> BoxFuture<'h, Result<T, E>> + Send,
        T: Send,
        E: From<CoreError> + Send,
    {
        let mut guard = self.inner.lock().await;
        let original_next_position = guard.next_position;
        let transaction_id = format!("mem-{}", Uuid::new_v4());
        let mut handle =
            MemoryTransactionalStore { inner: &mut guard, staged: Vec::new(), transaction_id };
        let result = f(&mut handle).await;
        let staged = std::mem::take(&mut handle.staged);
        match result {
            Ok(value) => {
                guard.events.extend(staged);
                Ok(value)
            }
            Err(e) => {
                guard.next_position = original_next_position;
                Err(e)
            }
        }
    }
}

struct MemoryTransactionalStore<'a> {
    inner: &'a mut MemoryInner,
    staged: Vec<StoredEvent>,
    transaction_id: String,
}

#[async_trait]
impl TransactionalStore for MemoryTransactionalStore<'_> {
    async fn query(
        &mut self,
        query: &Query,
        after: Option<&Cursor>,
    ) -> Result<Vec<StoredEvent>, CoreError> {
        let merged: Vec<StoredEvent> =
            self.inner.events.iter().chain(self.staged.iter()).cloned().collect();
        Ok(evaluate(&merged, query, after))
    }

    async fn append_if(
        &mut self,
        events: Vec<NewEvent>,
        condition: AppendCondition,
    ) -> Result<Vec<StoredEvent>, CoreError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        validate_new_events(&events)?;
        let merged: Vec<StoredEvent> =
            self.inner.events.iter().chain(self.staged.iter()).cloned().collect();
        check_condition(&merged, &condition)?;
        let stored: Vec<StoredEvent> = events
            .into_iter()
            .map(|e| stamp(self.inner, &self.transaction_id, e))
            .collect();
        self.staged.extend(stored.clone());
        Ok(stored)
    }

    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crablet_core::{QueryItem, Tag};

    fn event(t: &str, tags: &[(&str, &str)]) -> NewEvent {
        let tags = tags.iter().map(|(k, v)| Tag::new(*k, *v).unwrap()).collect();
        NewEvent::new(t, tags, b"{}".to_vec())
    }

    #[tokio::test]
    async fn empty_append_is_a_no_op() {
        let store = MemoryLogStore::new();
        let stored = store.append(vec![]).await.unwrap();
        assert!(stored.is_empty());
        assert!(store.all_events().await.is_empty());
    }

    #[tokio::test]
    async fn append_assigns_increasing_positions() {
        let store = MemoryLogStore::new();
        let stored = store.append(vec![event("A", &[]), event("B", &[])]).await.unwrap();
        assert_eq!(stored[0].position, 1);
        assert_eq!(stored[1].position, 2);
    }

    #[tokio::test]
    async fn append_if_rejects_stale_condition() {
        let store = MemoryLogStore::new();
        store.append(vec![event("WalletOpened", &[("wallet_id", "W1")])]).await.unwrap();

        let condition = AppendCondition::new(
            Cursor::zero(),
            Query::of(QueryItem::new().with_event_type("WalletOpened")),
        );
        let err = store.append_if(vec![event("Deposited", &[])], condition).await.unwrap_err();
        assert!(matches!(err, CoreError::Concurrency { .. }));
    }

    #[tokio::test]
    async fn append_if_rejects_duplicate() {
        let store = MemoryLogStore::new();
        store
            .append(vec![event("WalletOpened", &[("wallet_id", "W1")])])
            .await
            .unwrap();

        let condition = AppendCondition::unconditional()
            .with_already_exists(Query::of(QueryItem::new().with_event_type("WalletOpened")));
        let err = store.append_if(vec![event("WalletOpened", &[])], condition).await.unwrap_err();
        assert!(err.duplicate_reason().is_some());
    }

    #[tokio::test]
    async fn query_filters_by_after_cursor() {
        let store = MemoryLogStore::new();
        let first = store.append(vec![event("A", &[])]).await.unwrap();
        store.append(vec![event("A", &[])]).await.unwrap();

        let found = store.query(&Query::match_all(), Some(&first[0].cursor())).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].position, 2);
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let store = MemoryLogStore::new();
        let result: Result<(), CoreError> = store
            .execute_in_transaction(|tx| {
                Box::pin(async move {
                    tx.append_if(vec![event("A", &[])], AppendCondition::unconditional()).await?;
                    Err(CoreError::Validation("handler rejected".into()))
                })
            })
            .await;
        assert!(result.is_err());
        assert!(store.all_events().await.is_empty());
    }

    #[tokio::test]
    async fn transaction_commits_on_success() {
        let store = MemoryLogStore::new();
        store
            .execute_in_transaction::<_, _, CoreError>(|tx| {
                Box::pin(async move {
                    tx.append_if(vec![event("A", &[])], AppendCondition::unconditional()).await?;
                    Ok(())
                })
            })
            .await
            .unwrap();
        assert_eq!(store.all_events().await.len(), 1);
    }
}
