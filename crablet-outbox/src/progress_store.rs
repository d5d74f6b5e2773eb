//! Persistence for per-(topic, publisher) progress rows (§4.5, §6).

use crate::error::Result;
use crate::progress::{OutboxProgress, OutboxStatus};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Backend for reading and mutating `outbox_topic_progress` rows. Plain
/// async-fn-in-trait, never used as `dyn` — callers are generic over the
/// concrete store the same way [`crablet_eventlog::LogStore`] callers are.
pub trait ProgressStore: Send + Sync {
    /// Read the row for `(topic, publisher)`, inserting
    /// `ACTIVE`/`last_position=0` if this is the first observation.
    fn load_or_init(
        &self,
        topic: &str,
        publisher: &str,
    ) -> impl Future<Output = Result<OutboxProgress>> + Send;

    /// Record a successful batch: advance `last_position`, clear the error
    /// streak, stamp `last_published_at`.
    fn record_success(
        &self,
        topic: &str,
        publisher: &str,
        last_position: u64,
        published_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Record a failed batch: increment `error_count`, set `last_error`,
    /// auto-pausing to `FAILED` once `error_count >= max_retries`.
    fn record_failure(
        &self,
        topic: &str,
        publisher: &str,
        error: &str,
        max_retries: u32,
    ) -> impl Future<Output = Result<()>> + Send;

    fn pause(&self, topic: &str, publisher: &str) -> impl Future<Output = Result<()>> + Send;

    fn resume(&self, topic: &str, publisher: &str) -> impl Future<Output = Result<()>> + Send;

    /// Manual reset from `FAILED` back to `ACTIVE`, zeroing the error streak.
    fn reset(&self, topic: &str, publisher: &str) -> impl Future<Output = Result<()>> + Send;
}

pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory progress store for unit tests without a database.
    #[derive(Default)]
    pub struct MemoryProgressStore {
        rows: Mutex<HashMap<(String, String), OutboxProgress>>,
    }

    impl MemoryProgressStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl ProgressStore for MemoryProgressStore {
        async fn load_or_init(&self, topic: &str, publisher: &str) -> Result<OutboxProgress> {
            let mut rows = self.rows.lock().await;
            let row = rows
                .entry((topic.to_string(), publisher.to_string()))
                .or_insert_with(|| OutboxProgress::new(topic, publisher));
            Ok(row.clone())
        }

        async fn record_success(
            &self,
            topic: &str,
            publisher: &str,
            last_position: u64,
            published_at: DateTime<Utc>,
        ) -> Result<()> {
            let mut rows = self.rows.lock().await;
            let row = rows
                .entry((topic.to_string(), publisher.to_string()))
                .or_insert_with(|| OutboxProgress::new(topic, publisher));
            row.last_position = last_position as i64;
            row.error_count = 0;
            row.last_error = None;
            row.last_published_at = Some(published_at);
            row.updated_at = Utc::now();
            Ok(())
        }

        async fn record_failure(
            &self,
            topic: &str,
            publisher: &str,
            error: &str,
            max_retries: u32,
        ) -> Result<()> {
            let mut rows = self.rows.lock().await;
            let row = rows
                .entry((topic.to_string(), publisher.to_string()))
                .or_insert_with(|| OutboxProgress::new(topic, publisher));
            row.error_count += 1;
            row.last_error = Some(error.to_string());
            row.updated_at = Utc::now();
            if row.error_count as u32 >= max_retries {
                row.status = OutboxStatus::Failed;
            }
            Ok(())
        }

        async fn pause(&self, topic: &str, publisher: &str) -> Result<()> {
            let mut rows = self.rows.lock().await;
            if let Some(row) = rows.get_mut(&(topic.to_string(), publisher.to_string())) {
                row.status = OutboxStatus::Paused;
                row.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn resume(&self, topic: &str, publisher: &str) -> Result<()> {
            let mut rows = self.rows.lock().await;
            if let Some(row) = rows.get_mut(&(topic.to_string(), publisher.to_string())) {
                row.status = OutboxStatus::Active;
                row.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn reset(&self, topic: &str, publisher: &str) -> Result<()> {
            let mut rows = self.rows.lock().await;
            if let Some(row) = rows.get_mut(&(topic.to_string(), publisher.to_string())) {
                row.status = OutboxStatus::Active;
                row.error_count = 0;
                row.last_error = None;
                row.updated_at = Utc::now();
            }
            Ok(())
        }
    }
}

pub mod postgres {
    use super::*;
    use sqlx::PgPool;

    /// Postgres-backed progress store over `outbox_topic_progress`.
    pub struct PostgresProgressStore {
        pool: PgPool,
    }

    impl PostgresProgressStore {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }
    }

    impl ProgressStore for PostgresProgressStore {
        async fn load_or_init(&self, topic: &str, publisher: &str) -> Result<OutboxProgress> {
            let row = sqlx::query_as::<_, OutboxProgress>(
                r#"
                INSERT INTO outbox_topic_progress (topic, publisher, last_position, status, error_count)
                VALUES ($1, $2, 0, 'ACTIVE', 0)
                ON CONFLICT (topic, publisher) DO UPDATE SET topic = EXCLUDED.topic
                RETURNING topic, publisher, last_position, status, error_count, last_error,
                          leader_instance, leader_heartbeat, last_published_at, updated_at, created_at
                "#,
            )
            .bind(topic)
            .bind(publisher)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        }

        async fn record_success(
            &self,
            topic: &str,
            publisher: &str,
            last_position: u64,
            published_at: DateTime<Utc>,
        ) -> Result<()> {
            sqlx::query(
                r#"
                UPDATE outbox_topic_progress
                SET last_position = $3, error_count = 0, last_error = NULL,
                    last_published_at = $4, updated_at = NOW()
                WHERE topic = $1 AND publisher = $2
                "#,
            )
            .bind(topic)
            .bind(publisher)
            .bind(last_position as i64)
            .bind(published_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn record_failure(
            &self,
            topic: &str,
            publisher: &str,
            error: &str,
            max_retries: u32,
        ) -> Result<()> {
            sqlx::query(
                r#"
                UPDATE outbox_topic_progress
                SET error_count = error_count + 1,
                    last_error = $3,
                    status = CASE WHEN error_count + 1 >= $4 THEN 'FAILED' ELSE status END,
                    updated_at = NOW()
                WHERE topic = $1 AND publisher = $2
                "#,
            )
            .bind(topic)
            .bind(publisher)
            .bind(error)
            .bind(max_retries as i32)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn pause(&self, topic: &str, publisher: &str) -> Result<()> {
            sqlx::query(
                "UPDATE outbox_topic_progress SET status = 'PAUSED', updated_at = NOW() WHERE topic = $1 AND publisher = $2",
            )
            .bind(topic)
            .bind(publisher)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn resume(&self, topic: &str, publisher: &str) -> Result<()> {
            sqlx::query(
                "UPDATE outbox_topic_progress SET status = 'ACTIVE', updated_at = NOW() WHERE topic = $1 AND publisher = $2",
            )
            .bind(topic)
            .bind(publisher)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn reset(&self, topic: &str, publisher: &str) -> Result<()> {
            sqlx::query(
                r#"
                UPDATE outbox_topic_progress
                SET status = 'ACTIVE', error_count = 0, last_error = NULL, updated_at = NOW()
                WHERE topic = $1 AND publisher = $2
                "#,
            )
            .bind(topic)
            .bind(publisher)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

pub use memory::MemoryProgressStore;
pub use postgres::PostgresProgressStore;
