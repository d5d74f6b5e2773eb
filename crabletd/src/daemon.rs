//! Daemon: drives the outbox processing cycle on a fixed interval.
//!
//! # Lifecycle
//!
//! 1. Load configuration
//! 2. Build the bound `OutboxProcessor`
//! 3. Main loop: tick the processing cycle, watch for shutdown
//! 4. Graceful shutdown on SIGINT

use async_trait::async_trait;
use tracing::{info, warn};

use crablet_core::StoredEvent;
use crablet_eventlog::LogStore;
use crablet_outbox::{OutboxProcessor, ProgressStore, PublishMode, Publisher};

use crate::config::Config;
use crate::error::DaemonResult;

/// A publisher that logs every event it receives instead of forwarding it
/// anywhere. The default sink so the daemon does something observable with
/// no further wiring; real deployments register their own publishers in
/// place of (or alongside) this one.
pub struct LoggingPublisher {
    name: String,
}

impl LoggingPublisher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Publisher for LoggingPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> PublishMode {
        PublishMode::Batch
    }

    async fn publish_batch(&self, events: &[StoredEvent]) -> Result<(), String> {
        for event in events {
            info!(publisher = %self.name, position = event.position, event_type = %event.event_type, "outbox event");
        }
        Ok(())
    }
}

/// The crablet daemon: polls the outbox on `config.outbox.poll_interval`
/// until shutdown is requested.
pub struct Daemon<L: LogStore, S: ProgressStore> {
    config: Config,
    processor: OutboxProcessor<L, S>,
}

impl<L: LogStore, S: ProgressStore> Daemon<L, S> {
    pub fn new(config: Config, processor: OutboxProcessor<L, S>) -> Self {
        Self { config, processor }
    }

    /// Run the daemon. Blocks until shutdown is requested (SIGINT).
    pub async fn run(self) -> DaemonResult<()> {
        info!(environment = %self.config.environment, "starting crablet daemon");

        let mut interval = tokio::time::interval(self.config.outbox.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!("entering outbox processing loop");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.processor.run_cycle().await {
                        Ok(advanced) if advanced > 0 => {
                            info!(advanced, "outbox cycle published events");
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(%err, "outbox cycle failed");
                        }
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    async fn shutdown(&self) -> DaemonResult<()> {
        info!("shutdown complete");
        Ok(())
    }

    /// Run exactly one processing cycle — used by tests and the `db`-style
    /// one-shot CLI invocations that don't want the long-running loop.
    pub async fn run_once(&self) -> DaemonResult<u32> {
        Ok(self.processor.run_cycle().await?)
    }
}
