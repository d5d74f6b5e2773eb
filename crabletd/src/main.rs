//! Crablet Daemon
//!
//! Runs the outbox processing loop against Postgres.
//!
//! # Usage
//!
//! ```bash
//! # Start the daemon with default configuration
//! crabletd
//!
//! # Database migrations
//! crabletd db migrate
//! crabletd db status
//!
//! # Start with custom environment
//! CRABLET_ENV=production CRABLET_OUTBOX_POLL_INTERVAL_MS=500 crabletd
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required outside `test`)
//! - `CRABLET_ENV`: Environment (test, development, production)
//! - `CRABLET_OUTBOX_POLL_INTERVAL_MS`: Outbox cycle interval (default: 1000)
//! - `CRABLET_OUTBOX_BATCH_SIZE`: Max events published per pair per cycle (default: 100)
//! - `CRABLET_OUTBOX_MAX_RETRIES`: Consecutive failures before auto-pause (default: 5)
//! - `CRABLET_OUTBOX_LOCK_STRATEGY`: `global` or `per-topic-publisher` (default: global)

mod db;

use crablet_eventlog::PostgresLogStore;
use crablet_outbox::{OutboxProcessor, PostgresProgressStore, TopicConfig};
use crabletd::daemon::LoggingPublisher;
use crabletd::{Config, Daemon};
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("crabletd=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "db" {
        return db::run_db_command(args).await;
    }

    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        poll_interval_ms = config.outbox.poll_interval.as_millis(),
        "crablet daemon"
    );

    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required outside the test environment"))?;
    let pool = PgPool::connect(&database_url).await?;

    let store = PostgresLogStore::new(pool.clone());
    let progress = PostgresProgressStore::new(pool.clone());

    let processor = OutboxProcessor::new(
        store,
        progress,
        config.outbox.lock_strategy,
        Some(pool),
        config.outbox.batch_size,
        config.outbox.max_retries,
    )
    .with_publisher("audit", TopicConfig::new(), Box::new(LoggingPublisher::new("audit-log")));

    let daemon = Daemon::new(config, processor);
    daemon.run().await?;

    Ok(())
}
