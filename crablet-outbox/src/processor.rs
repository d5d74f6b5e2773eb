//! The outbox processing cycle (§4.5): fetch, publish, advance, per pair.

use crate::circuit::CircuitRegistry;
use crate::error::{OutboxError, Result};
use crate::lock::{lock_key_for, AdvisoryLock, LockStrategy};
use crate::progress::OutboxStatus;
use crate::progress_store::ProgressStore;
use crate::publisher::{PublishMode, Publisher};
use crate::topic::TopicConfig;
use chrono::Utc;
use crablet_core::{Cursor, Query};
use crablet_eventlog::LogStore;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One (topic, publisher) binding the processor drives each cycle.
struct Pair {
    topic: String,
    topic_config: TopicConfig,
    publisher: Box<dyn Publisher>,
}

/// Drives registered publishers against a [`LogStore`], tracking progress
/// in a [`ProgressStore`]. Leader election (when `lock_pool` is set) keeps
/// only one process acting on a given pair at a time; without a pool every
/// owned pair is processed unconditionally (the embedded/test mode).
pub struct OutboxProcessor<L: LogStore, S: ProgressStore> {
    store: L,
    progress: S,
    pairs: Vec<Pair>,
    lock_strategy: LockStrategy,
    lock_pool: Option<PgPool>,
    batch_size: u64,
    max_retries: u32,
    breakers: CircuitRegistry,
}

impl<L: LogStore, S: ProgressStore> OutboxProcessor<L, S> {
    pub fn new(
        store: L,
        progress: S,
        lock_strategy: LockStrategy,
        lock_pool: Option<PgPool>,
        batch_size: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            progress,
            pairs: Vec::new(),
            lock_strategy,
            lock_pool,
            batch_size,
            max_retries,
            breakers: CircuitRegistry::new(),
        }
    }

    /// The underlying progress store, for callers that need to inspect or
    /// reset a pair's state directly rather than through a cycle.
    pub fn progress(&self) -> &S {
        &self.progress
    }

    /// Bind `publisher` to `topic`/`topic_config`. One publisher may be
    /// bound to only one topic at a time by construction — bind it again
    /// under a different topic name to fan the same sink out to more than
    /// one topic.
    pub fn with_publisher(
        mut self,
        topic: impl Into<String>,
        topic_config: TopicConfig,
        publisher: Box<dyn Publisher>,
    ) -> Self {
        self.pairs.push(Pair { topic: topic.into(), topic_config, publisher });
        self
    }

    /// Run one processing cycle over every bound pair this instance owns
    /// the lock for. Returns the number of pairs that published at least
    /// one event.
    pub async fn run_cycle(&self) -> Result<u32> {
        let mut advanced = 0;
        for pair in &self.pairs {
            let key = lock_key_for(self.lock_strategy, &pair.topic, pair.publisher.name());
            let _lock = match &self.lock_pool {
                Some(pool) => match AdvisoryLock::try_acquire(pool, key).await {
                    Ok(Some(lock)) => Some(lock),
                    Ok(None) => {
                        debug!(topic = %pair.topic, publisher = pair.publisher.name(), "lock held elsewhere, skipping");
                        continue;
                    }
                    Err(err) => {
                        warn!(%err, "failed to attempt advisory lock acquisition");
                        continue;
                    }
                },
                None => None,
            };

            match self.process_pair(pair).await {
                Ok(true) => advanced += 1,
                Ok(false) => {}
                Err(err) => warn!(%err, topic = %pair.topic, publisher = pair.publisher.name(), "outbox cycle failed for pair"),
            }
        }
        Ok(advanced)
    }

    async fn process_pair(&self, pair: &Pair) -> Result<bool> {
        let publisher = pair.publisher.as_ref();
        let progress = self.progress.load_or_init(&pair.topic, publisher.name()).await?;

        if !progress.status.is_processable() {
            debug!(topic = %pair.topic, publisher = publisher.name(), status = ?progress.status, "pair not processable, skipping");
            return Ok(false);
        }

        let cursor = Cursor { position: progress.last_position as u64, ..Cursor::zero() };
        let events = self.store.query(&Query::match_all(), Some(&cursor)).await?;

        let matching: Vec<_> = events
            .into_iter()
            .filter(|e| pair.topic_config.matches(&e.tags))
            .take(self.batch_size as usize)
            .collect();

        if matching.is_empty() {
            return Ok(false);
        }

        if !self.breakers.is_call_permitted(publisher.name()) {
            return Err(OutboxError::CircuitOpen(publisher.name().to_string()));
        }

        let last_successful_position = match publisher.mode() {
            PublishMode::Batch => match publisher.publish_batch(&matching).await {
                Ok(()) => {
                    self.breakers.on_success(publisher.name());
                    matching.last().map(|e| e.position)
                }
                Err(reason) => {
                    self.breakers.on_error(publisher.name());
                    self.record_failure(pair, &reason).await?;
                    return Err(OutboxError::PublishFailed {
                        publisher: publisher.name().to_string(),
                        reason,
                    });
                }
            },
            PublishMode::Individual => {
                let mut last_ok = None;
                for event in &matching {
                    match publisher.publish_batch(std::slice::from_ref(event)).await {
                        Ok(()) => {
                            self.breakers.on_success(publisher.name());
                            last_ok = Some(event.position);
                        }
                        Err(reason) => {
                            self.breakers.on_error(publisher.name());
                            if let Some(position) = last_ok {
                                self.progress
                                    .record_success(&pair.topic, publisher.name(), position, Utc::now())
                                    .await?;
                            }
                            self.record_failure(pair, &reason).await?;
                            return Err(OutboxError::PublishFailed {
                                publisher: publisher.name().to_string(),
                                reason,
                            });
                        }
                    }
                }
                last_ok
            }
        };

        if let Some(position) = last_successful_position {
            self.progress.record_success(&pair.topic, publisher.name(), position, Utc::now()).await?;
            info!(topic = %pair.topic, publisher = publisher.name(), position, count = matching.len(), "outbox batch published");
        }

        Ok(true)
    }

    async fn record_failure(&self, pair: &Pair, reason: &str) -> Result<()> {
        self.progress.record_failure(&pair.topic, pair.publisher.name(), reason, self.max_retries).await?;
        warn!(topic = %pair.topic, publisher = pair.publisher.name(), %reason, "outbox publish failed");
        Ok(())
    }
}

/// Manually pause/resume/reset a pair outside the normal cycle (operator
/// action on the status state machine, §4.5).
pub async fn pause<S: ProgressStore>(progress: &S, topic: &str, publisher: &str) -> Result<()> {
    progress.pause(topic, publisher).await
}

pub async fn resume<S: ProgressStore>(progress: &S, topic: &str, publisher: &str) -> Result<()> {
    progress.resume(topic, publisher).await
}

pub async fn reset<S: ProgressStore>(progress: &S, topic: &str, publisher: &str) -> Result<()> {
    progress.reset(topic, publisher).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crablet_core::{NewEvent, Tag};
    use crablet_eventlog::MemoryLogStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingPublisher {
        name: String,
        mode: PublishMode,
        calls: Arc<AtomicUsize>,
        fail_after: Option<usize>,
    }

    #[async_trait::async_trait]
    impl Publisher for RecordingPublisher {
        fn name(&self) -> &str {
            &self.name
        }

        fn mode(&self) -> PublishMode {
            self.mode
        }

        async fn publish_batch(&self, events: &[crablet_core::StoredEvent]) -> Result<(), String> {
            let seen = self.calls.fetch_add(events.len(), Ordering::SeqCst);
            if let Some(limit) = self.fail_after {
                if seen >= limit {
                    return Err("simulated failure".to_string());
                }
            }
            Ok(())
        }
    }

    async fn seed(store: &MemoryLogStore, n: usize) {
        for i in 0..n {
            let event = NewEvent::json(
                "WalletOpened",
                vec![Tag::new("wallet_id", format!("W{i}")).unwrap()],
                &serde_json::json!({}),
            )
            .unwrap();
            store.append(vec![event]).await.unwrap();
        }
    }

    #[tokio::test]
    async fn publishes_matching_events_and_advances_position() {
        let store = MemoryLogStore::new();
        seed(&store, 3).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let publisher = RecordingPublisher {
            name: "audit".to_string(),
            mode: PublishMode::Batch,
            calls: calls.clone(),
            fail_after: None,
        };

        let processor = OutboxProcessor::new(
            store,
            crate::progress_store::MemoryProgressStore::new(),
            LockStrategy::Global,
            None,
            10,
            3,
        )
        .with_publisher("wallet-events", TopicConfig::new(), Box::new(publisher));

        let advanced = processor.run_cycle().await.unwrap();
        assert_eq!(advanced, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let second = processor.run_cycle().await.unwrap();
        assert_eq!(second, 0, "no new events, nothing to publish");
    }

    #[tokio::test]
    async fn repeated_failures_auto_pause_the_pair() {
        let store = MemoryLogStore::new();
        seed(&store, 1).await;

        let publisher = RecordingPublisher {
            name: "flaky".to_string(),
            mode: PublishMode::Batch,
            calls: Arc::new(AtomicUsize::new(0)),
            fail_after: Some(0),
        };

        let progress = crate::progress_store::MemoryProgressStore::new();
        let processor = OutboxProcessor::new(store, progress, LockStrategy::Global, None, 10, 2)
            .with_publisher("wallet-events", TopicConfig::new(), Box::new(publisher));

        // A pair's publish failure is logged and folds into its progress
        // row, but never fails the cycle as a whole — other pairs still
        // get their turn.
        assert_eq!(processor.run_cycle().await.unwrap(), 0);
        assert_eq!(processor.run_cycle().await.unwrap(), 0);

        let row = processor.progress().load_or_init("wallet-events", "flaky").await.unwrap();
        assert_eq!(row.status, OutboxStatus::Failed);
    }
}
