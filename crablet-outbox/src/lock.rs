//! Leader election via Postgres session-level advisory locks (§4.5, §5).
//!
//! A lock is held on a dedicated, unpooled connection for the lifetime of
//! the leader; closing the connection (including process death) releases
//! it server-side regardless of whether `Drop` runs cleanly.

use sha2::{Digest, Sha256};
use sqlx::postgres::PgConnection;
use sqlx::{Connection, PgPool};
use tracing::warn;

/// Which advisory-lock keys are taken: one key system-wide, or one per
/// (topic, publisher) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrategy {
    Global,
    PerTopicPublisher,
}

/// Derive a bigint advisory-lock key from a (topic, publisher) pair (or a
/// fixed label under [`LockStrategy::Global`]), the same SHA-256-then-
/// truncate approach used for idempotency keys.
pub fn hashed_lock_key(label: &str) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    i64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is at least 8 bytes"))
}

pub fn lock_key_for(strategy: LockStrategy, topic: &str, publisher: &str) -> i64 {
    match strategy {
        LockStrategy::Global => hashed_lock_key("crablet-outbox"),
        LockStrategy::PerTopicPublisher => hashed_lock_key(&format!("{topic}:{publisher}")),
    }
}

/// RAII guard around a held `pg_try_advisory_lock`. Dropping it spawns a
/// best-effort unlock on its dedicated connection; failures are logged,
/// never panicked on, since connection death alone already releases the
/// lock server-side.
pub struct AdvisoryLock {
    conn: Option<PgConnection>,
    key: i64,
}

impl AdvisoryLock {
    /// Non-blocking acquisition attempt on a fresh, dedicated connection
    /// (never a pooled one, so holding it doesn't starve the pool).
    pub async fn try_acquire(pool: &PgPool, key: i64) -> sqlx::Result<Option<Self>> {
        let url = pool.connect_options();
        let mut conn = PgConnection::connect_with(&url).await?;

        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(key)
            .fetch_one(&mut conn)
            .await?;

        Ok(acquired.then(|| Self { conn: Some(conn), key }))
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else { return };
        let key = self.key;
        tokio::spawn(async move {
            if let Err(err) =
                sqlx::query("SELECT pg_advisory_unlock($1)").bind(key).execute(&mut conn).await
            {
                warn!(%err, lock_key = key, "failed to release advisory lock on drop");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_strategy_ignores_pair() {
        let a = lock_key_for(LockStrategy::Global, "topic-a", "pub-a");
        let b = lock_key_for(LockStrategy::Global, "topic-b", "pub-b");
        assert_eq!(a, b);
    }

    #[test]
    fn per_pair_strategy_differs_by_pair() {
        let a = lock_key_for(LockStrategy::PerTopicPublisher, "topic-a", "pub-a");
        let b = lock_key_for(LockStrategy::PerTopicPublisher, "topic-b", "pub-a");
        assert_ne!(a, b);
    }

    #[test]
    fn key_derivation_is_deterministic() {
        let a = hashed_lock_key("wallet-events:audit-log");
        let b = hashed_lock_key("wallet-events:audit-log");
        assert_eq!(a, b);
    }
}
