//! Seeding helpers for tests that drive a [`LogStore`] directly.

use crablet_core::{NewEvent, StoredEvent, Tag};
use crablet_eventlog::LogStore;
use serde::Serialize;

/// One event to seed, as a `(event_type, tags, payload)` triple. `tags` is
/// a list of `(key, value)` pairs so call sites can write them as array
/// literals instead of building [`Tag`]s by hand.
pub struct SeedEvent<'a, T> {
    pub event_type: &'a str,
    pub tags: &'a [(&'a str, &'a str)],
    pub payload: T,
}

/// Append one JSON-payload event to `store`, outside any append condition.
pub async fn append_event<L: LogStore>(
    store: &L,
    event_type: &str,
    tags: &[(&str, &str)],
    payload: &impl Serialize,
) -> anyhow::Result<StoredEvent> {
    let tags = tags
        .iter()
        .map(|(k, v)| Tag::new(*k, *v))
        .collect::<Result<Vec<_>, _>>()?;
    let event = NewEvent::json(event_type, tags, payload)?;
    let stored = store.append(vec![event]).await?;
    Ok(stored.into_iter().next().expect("append returns one row per input event"))
}

/// Append a batch of events in one transaction, in order.
pub async fn seed_events<L: LogStore, T: Serialize>(
    store: &L,
    events: Vec<SeedEvent<'_, T>>,
) -> anyhow::Result<Vec<StoredEvent>> {
    let mut new_events = Vec::with_capacity(events.len());
    for seed in events {
        let tags = seed
            .tags
            .iter()
            .map(|(k, v)| Tag::new(*k, *v))
            .collect::<Result<Vec<_>, _>>()?;
        new_events.push(NewEvent::json(seed.event_type, tags, &seed.payload)?);
    }
    Ok(store.append(new_events).await?)
}
