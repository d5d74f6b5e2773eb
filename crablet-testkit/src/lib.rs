//! Test helpers for crablet's database-backed tests.
//!
//! Provides event-seeding helpers over a [`crablet_eventlog::LogStore`] and
//! a testcontainers-backed Postgres bootstrap for integration tests that
//! need the real backend rather than [`crablet_eventlog::MemoryLogStore`].

mod container;
mod helpers;

pub use container::start_postgres;
pub use helpers::{append_event, seed_events, SeedEvent};

use anyhow::Result;
use sqlx::PgPool;

/// Run this workspace's migrations against `pool`. Convenience wrapper so
/// test crates don't need a direct `crablet-db` dependency.
pub async fn setup_test_db(pool: &PgPool) -> Result<()> {
    crablet_db::migrate(pool).await
}
