//! Leader handoff under `PER_TOPIC_PUBLISHER` locking (§4.5, §5, §8 scenario
//! f): two processor instances racing for the same (topic, publisher) pair.
//! Whichever holds the advisory lock processes; the other sits out. Once the
//! lock holder's connection closes, the other acquires it and resumes from
//! the last committed position. Requires Docker; run with `cargo test -- --ignored`.

use crablet_core::{NewEvent, StoredEvent, Tag};
use crablet_eventlog::{LogStore, PostgresLogStore};
use crablet_outbox::lock::{lock_key_for, AdvisoryLock};
use crablet_outbox::{LockStrategy, OutboxProcessor, PostgresProgressStore, PublishMode, Publisher, TopicConfig};
use std::sync::{Arc, Mutex};

struct RecordingPublisher {
    seen: Arc<Mutex<Vec<u64>>>,
}

#[async_trait::async_trait]
impl Publisher for RecordingPublisher {
    fn name(&self) -> &str {
        "P1"
    }

    fn mode(&self) -> PublishMode {
        PublishMode::Batch
    }

    async fn publish_batch(&self, events: &[StoredEvent]) -> Result<(), String> {
        self.seen.lock().unwrap().extend(events.iter().map(|e| e.position));
        Ok(())
    }
}

fn wallets_topic() -> TopicConfig {
    TopicConfig::new().require_tag("wallet_id")
}

fn make_processor(
    pool: sqlx::PgPool,
    seen: Arc<Mutex<Vec<u64>>>,
) -> OutboxProcessor<PostgresLogStore, PostgresProgressStore> {
    OutboxProcessor::new(
        PostgresLogStore::new(pool.clone()),
        PostgresProgressStore::new(pool.clone()),
        LockStrategy::PerTopicPublisher,
        Some(pool),
        10,
        3,
    )
    .with_publisher("wallets", wallets_topic(), Box::new(RecordingPublisher { seen }))
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn instance_two_resumes_from_instance_one_position_after_handoff() {
    let (pool, _container) = crablet_testkit::start_postgres().await;
    let log = PostgresLogStore::new(pool.clone());

    let first_event = log
        .append(vec![NewEvent::json(
            "WalletOpened",
            vec![Tag::new("wallet_id", "W1").unwrap()],
            &serde_json::json!({}),
        )
        .unwrap()])
        .await
        .unwrap();

    let instance_one_seen = Arc::new(Mutex::new(Vec::new()));
    let instance_one = make_processor(pool.clone(), instance_one_seen.clone());

    // Instance one is the leader and commits the only event so far.
    let advanced = instance_one.run_cycle().await.unwrap();
    assert_eq!(advanced, 1);
    assert_eq!(*instance_one_seen.lock().unwrap(), vec![first_event[0].position]);

    // It keeps holding the lock past that cycle (e.g. mid-heartbeat) while
    // more events arrive and instance two tries to take over and can't.
    let key = lock_key_for(LockStrategy::PerTopicPublisher, "wallets", "P1");
    let held = AdvisoryLock::try_acquire(&pool, key).await.unwrap().expect("lock free to take");

    let later_events = log
        .append(vec![
            NewEvent::json(
                "DepositMade",
                vec![Tag::new("wallet_id", "W1").unwrap()],
                &serde_json::json!({"amount": 50}),
            )
            .unwrap(),
            NewEvent::json(
                "WithdrawalMade",
                vec![Tag::new("wallet_id", "W1").unwrap()],
                &serde_json::json!({"amount": 30}),
            )
            .unwrap(),
        ])
        .await
        .unwrap();

    let instance_two_seen = Arc::new(Mutex::new(Vec::new()));
    let instance_two = make_processor(pool.clone(), instance_two_seen.clone());
    let blocked = instance_two.run_cycle().await.unwrap();
    assert_eq!(blocked, 0, "instance two can't acquire the lock while instance one holds it");
    assert!(instance_two_seen.lock().unwrap().is_empty());

    // Instance one's connection closes, releasing the lock.
    drop(held);

    // Instance two now acquires it and resumes from instance one's last
    // committed position rather than replaying the first event too.
    let resumed = instance_two.run_cycle().await.unwrap();
    assert_eq!(resumed, 1);
    assert_eq!(
        *instance_two_seen.lock().unwrap(),
        vec![later_events[0].position, later_events[1].position]
    );

    let row = instance_two.progress().load_or_init("wallets", "P1").await.unwrap();
    assert_eq!(row.last_position, later_events[1].position as i64);
}
