//! The boundary to downstream consumers of the log (§4.5, §6).

use crablet_core::StoredEvent;

/// How a [`Publisher`] wants its batch delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// The whole matching slice is handed to `publish_batch` at once.
    Batch,
    /// `publish_batch` is called once per event (a one-element slice); on
    /// the first failure the cycle stops so ordering is preserved and the
    /// next cycle retries from the last successfully published event.
    Individual,
}

/// A downstream consumer of one topic. Names must be unique and stable
/// across restarts — they key the progress row. Publishers must tolerate
/// duplicate deliveries (at-least-once, §4.5).
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    fn mode(&self) -> PublishMode;

    /// Deliver `events`. Under [`PublishMode::Individual`] this is always
    /// called with exactly one event.
    async fn publish_batch(&self, events: &[StoredEvent]) -> Result<(), String>;
}
