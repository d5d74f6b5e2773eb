//! Postgres-backed [`LogStore`] (§4.1, §6). Every append takes a global
//! advisory transaction lock (released automatically at commit/rollback)
//! so the condition check and the insert observe a consistent view of the
//! log — a stand-in for locking a single aggregate row, generalized since
//! there's no single row to lock against an arbitrary dynamic query.

use crate::query_sql::{self, Bind};
use crate::store::{BoxFuture, LogStore, TransactionalStore};
use crate::validate::validate_new_events;
use async_trait::async_trait;
use crablet_core::{tags, AppendCondition, CoreError, Cursor, NewEvent, Query, StoredEvent};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

/// The fixed advisory-lock key every append transaction takes. A real
/// sharded deployment would key this off something narrower; a single
/// global key keeps this implementation correct without needing to reason
/// about which shard a dynamic cross-tag query could touch.
const APPEND_LOCK_KEY: i64 = 0x6372_626c_6574; // "crblet" in hex, truncated to i64

fn map_sqlx(e: sqlx::Error) -> CoreError {
    CoreError::Persistence(e.to_string())
}

async fn take_append_lock(tx: &mut Transaction<'_, Postgres>) -> Result<(), CoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(APPEND_LOCK_KEY)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

fn bind_query<'q, O>(
    mut builder: sqlx::query::QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments>,
    binds: &'q [Bind],
) -> sqlx::query::QueryAs<'q, Postgres, O, sqlx::postgres::PgArguments>
where
    O: Send + Unpin,
{
    for bind in binds {
        builder = match bind {
            Bind::Text(s) => builder.bind(s),
            Bind::TextArray(v) => builder.bind(v),
        };
    }
    builder
}

#[derive(sqlx::FromRow)]
struct EventRow {
    position: i64,
    transaction_id: String,
    event_type: String,
    tags: Vec<String>,
    payload: Vec<u8>,
    occurred_at: chrono::DateTime<chrono::Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        StoredEvent {
            position: row.position as u64,
            transaction_id: row.transaction_id,
            event_type: row.event_type,
            tags: tags::from_db_array(&row.tags),
            payload: row.payload,
            occurred_at: row.occurred_at,
        }
    }
}

async fn matches_exist(
    tx: &mut Transaction<'_, Postgres>,
    query: &Query,
    min_position: Option<u64>,
) -> Result<bool, CoreError> {
    let compiled = query_sql::compile(query, 2);
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM events WHERE position > $1 AND {}) AS hit",
        compiled.sql
    );
    let mut q = sqlx::query(&sql).bind(min_position.unwrap_or(0) as i64);
    for bind in &compiled.binds {
        q = match bind {
            Bind::Text(s) => q.bind(s),
            Bind::TextArray(v) => q.bind(v),
        };
    }
    let row = q.fetch_one(&mut **tx).await.map_err(map_sqlx)?;
    Ok(row.try_get::<bool, _>("hit").map_err(map_sqlx)?)
}

async fn check_condition(
    tx: &mut Transaction<'_, Postgres>,
    condition: &AppendCondition,
) -> Result<(), CoreError> {
    if condition.is_unconstrained() {
        return Ok(());
    }
    if matches_exist(tx, &condition.state_changed, Some(condition.after_cursor.position)).await? {
        return Err(CoreError::stale());
    }
    if let Some(already_exists) = &condition.already_exists {
        if matches_exist(tx, already_exists, None).await? {
            return Err(CoreError::duplicate("DUPLICATE_OPERATION"));
        }
    }
    Ok(())
}

async fn insert_events(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: &str,
    events: Vec<NewEvent>,
) -> Result<Vec<StoredEvent>, CoreError> {
    let mut stored = Vec::with_capacity(events.len());
    for event in events {
        let db_tags = tags::to_db_array(&event.tags);
        let row: (i64, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
            r#"
            INSERT INTO events (transaction_id, event_type, tags, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING position, occurred_at
            "#,
        )
        .bind(transaction_id)
        .bind(&event.event_type)
        .bind(&db_tags)
        .bind(&event.payload)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx)?;

        debug!(position = row.0, event_type = %event.event_type, transaction_id = %transaction_id, "event appended");

        stored.push(StoredEvent {
            position: row.0 as u64,
            transaction_id: transaction_id.to_string(),
            event_type: event.event_type,
            tags: event.tags,
            payload: event.payload,
            occurred_at: row.1,
        });
    }
    Ok(stored)
}

/// A [`LogStore`] backed by Postgres.
pub struct PostgresLogStore {
    pool: PgPool,
}

impl PostgresLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl LogStore for PostgresLogStore {
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
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        take_append_lock(&mut tx).await?;

        if let Err(e) = check_condition(&mut tx, &condition).await {
            let _ = tx.rollback().await;
            if let CoreError::Concurrency { kind } = &e {
                warn!(?kind, "append rejected by condition check");
            }
            return Err(e);
        }

        let transaction_id = Uuid::now_v7().to_string();
        let stored = match insert_events(&mut tx, &transaction_id, events).await {
            Ok(s) => s,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        };
        tx.commit().await.map_err(map_sqlx)?;
        Ok(stored)
    }

    async fn query(
        &self,
        query: &Query,
        after: Option<&Cursor>,
    ) -> Result<Vec<StoredEvent>, CoreError> {
        let compiled = query_sql::compile(query, 2);
        let sql = format!(
            "SELECT position, transaction_id, event_type, tags, payload, occurred_at \
             FROM events WHERE position > $1 AND {} ORDER BY position ASC",
            compiled.sql
        );
        let after_position = after.map(|c| c.position).unwrap_or(0) as i64;
        let builder = sqlx::query_as::<_, EventRow>(&sql).bind(after_position);
        let builder = bind_query(builder, &compiled.binds);
        let rows = builder.fetch_all(&self.pool).await.map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn execute_in_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'h> FnOnce(&'h mut dyn TransactionalStore) -> BoxFuture<'h, Result<T, E>> + Send,
        T: Send,
        E: From<CoreError> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(|e| E::from(map_sqlx(e)))?;
        if let Err(e) = take_append_lock(&mut tx).await {
            let _ = tx.rollback().await;
            return Err(E::from(e));
        }
        let transaction_id = Uuid::now_v7().to_string();
        let mut handle = PgTransactionalStore { tx, transaction_id };
        let result = f(&mut handle).await;
        match result {
            Ok(value) => {
                handle.tx.commit().await.map_err(|e| E::from(map_sqlx(e)))?;
                Ok(value)
            }
            Err(e) => {
                let _ = handle.tx.rollback().await;
                Err(e)
            }
        }
    }
}

/// A transactional handle over one live Postgres transaction, passed to
/// command handlers by `crablet-exec`.
pub struct PgTransactionalStore {
    tx: Transaction<'static, Postgres>,
    transaction_id: String,
}

#[async_trait]
impl TransactionalStore for PgTransactionalStore {
    async fn query(
        &mut self,
        query: &Query,
        after: Option<&Cursor>,
    ) -> Result<Vec<StoredEvent>, CoreError> {
        let compiled = query_sql::compile(query, 2);
        let sql = format!(
            "SELECT position, transaction_id, event_type, tags, payload, occurred_at \
             FROM events WHERE position > $1 AND {} ORDER BY position ASC",
            compiled.sql
        );
        let after_position = after.map(|c| c.position).unwrap_or(0) as i64;
        let builder = sqlx::query_as::<_, EventRow>(&sql).bind(after_position);
        let builder = bind_query(builder, &compiled.binds);
        let rows = builder.fetch_all(&mut *self.tx).await.map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
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
        check_condition(&mut self.tx, &condition).await?;
        insert_events(&mut self.tx, &self.transaction_id, events).await
    }

    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}
