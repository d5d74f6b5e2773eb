//! Auto-pause on repeated publish failure, and manual reset (§4.5, §8
//! scenario e): after `max_retries` consecutive failures the pair is marked
//! `FAILED` and stops advancing; a manual reset clears the streak.

use crablet_core::{NewEvent, StoredEvent, Tag};
use crablet_eventlog::{LogStore, MemoryLogStore};
use crablet_outbox::{
    LockStrategy, MemoryProgressStore, OutboxProcessor, OutboxStatus, ProgressStore, PublishMode,
    Publisher, TopicConfig,
};

struct AlwaysFailingPublisher;

#[async_trait::async_trait]
impl Publisher for AlwaysFailingPublisher {
    fn name(&self) -> &str {
        "flaky"
    }

    fn mode(&self) -> PublishMode {
        PublishMode::Batch
    }

    async fn publish_batch(&self, _events: &[StoredEvent]) -> Result<(), String> {
        Err("downstream unreachable".to_string())
    }
}

#[tokio::test]
async fn four_failures_with_max_retries_three_auto_pauses_then_manual_reset_clears_it() {
    let store = MemoryLogStore::new();
    store
        .append(vec![NewEvent::json(
            "WalletOpened",
            vec![Tag::new("wallet_id", "W1").unwrap()],
            &serde_json::json!({}),
        )
        .unwrap()])
        .await
        .unwrap();

    let max_retries = 3;
    let processor = OutboxProcessor::new(
        store,
        MemoryProgressStore::new(),
        LockStrategy::Global,
        None,
        10,
        max_retries,
    )
    .with_publisher("wallets", TopicConfig::new(), Box::new(AlwaysFailingPublisher));

    // A pair's publish failure never fails the cycle as a whole — it's
    // logged and folded into the progress row instead. The first three
    // cycles each attempt and fail; once `error_count` reaches
    // `max_retries` the pair flips to FAILED and the fourth cycle skips it
    // outright rather than recording a fifth error.
    for _ in 0..4 {
        assert_eq!(processor.run_cycle().await.unwrap(), 0);
    }

    let row = processor.progress().load_or_init("wallets", "flaky").await.unwrap();
    assert_eq!(row.status, OutboxStatus::Failed);
    assert_eq!(row.error_count, 3);
    assert_eq!(row.last_position, 0, "never advanced past its starting position");

    processor.progress().reset("wallets", "flaky").await.unwrap();
    let reset_row = processor.progress().load_or_init("wallets", "flaky").await.unwrap();
    assert_eq!(reset_row.status, OutboxStatus::Active);
    assert_eq!(reset_row.error_count, 0);
    assert!(reset_row.last_error.is_none());
}
