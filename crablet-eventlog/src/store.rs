//! The Log Store (§4.1): the only component allowed to assign positions.

use async_trait::async_trait;
use crablet_core::{AppendCondition, CoreError, Cursor, NewEvent, Query, StoredEvent};
use std::future::Future;
use std::pin::Pin;

/// A boxed, `Send` future, used by [`LogStore::execute_in_transaction`] since
/// the transactional closure's body is itself async.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A transactional handle over a single in-flight database transaction.
/// Every append made through one handle shares one `transaction_id`
/// (§3, §4.4). Object-safe so a [`crate::LogStore::execute_in_transaction`]
/// caller never needs to know which backend it's talking to.
#[async_trait]
pub trait TransactionalStore: Send {
    /// Read events matching `query`, starting strictly after `after`
    /// (`None` = from the beginning), ordered by position ascending.
    async fn query(
        &mut self,
        query: &Query,
        after: Option<&Cursor>,
    ) -> Result<Vec<StoredEvent>, CoreError>;

    /// Append `events` iff `condition` holds. Handlers may call this
    /// directly but normally don't — the executor applies the command's
    /// condition after the handler returns (§4.4).
    async fn append_if(
        &mut self,
        events: Vec<NewEvent>,
        condition: AppendCondition,
    ) -> Result<Vec<StoredEvent>, CoreError>;

    /// The transaction id every append through this handle will carry.
    fn transaction_id(&self) -> &str;
}

/// The log store (§4.1): append-only, globally ordered, queryable by
/// tag/type predicates (§4.2).
pub trait LogStore: Send + Sync {
    /// Append unconditionally. Equivalent to `append_if` with
    /// [`AppendCondition::unconditional`].
    fn append(
        &self,
        events: Vec<NewEvent>,
    ) -> impl Future<Output = Result<Vec<StoredEvent>, CoreError>> + Send;

    /// Append iff `condition` holds, checked under the same transaction
    /// that performs the insert (§4.4 concurrency semantics).
    fn append_if(
        &self,
        events: Vec<NewEvent>,
        condition: AppendCondition,
    ) -> impl Future<Output = Result<Vec<StoredEvent>, CoreError>> + Send;

    /// Read events matching `query`, ordered by position ascending.
    fn query(
        &self,
        query: &Query,
        after: Option<&Cursor>,
    ) -> impl Future<Output = Result<Vec<StoredEvent>, CoreError>> + Send;

    /// Run `f` with a transactional store handle that shares one database
    /// transaction and one transaction id for every append made through
    /// it. Commits on `Ok`, rolls back on `Err`. `E` must be constructible
    /// from [`CoreError`] so callers (typically `crablet-exec`) can use
    /// their own error type throughout the closure body.
    fn execute_in_transaction<F, T, E>(
        &self,
        f: F,
    ) -> impl Future<Output = Result<T, E>> + Send
    where
        F: for<'h> FnOnce(&'h mut dyn TransactionalStore) -> BoxFuture<'h, Result<T, E>>
            + Send,
        T: Send,
        E: From<CoreError> + Send;
}
