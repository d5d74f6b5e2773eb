//! The Projector (§4.3): fold-style state reconstruction over a slice of
//! the log selected by a [`Query`].

use crablet_core::{Cursor, Deserializer, Query, StoredEvent};

/// One projection. `S` is the folded state type. Implementations are pure
/// with respect to the state they return — no I/O, no side effects beyond
/// the returned value.
pub trait StateProjector<S>: Send + Sync {
    /// The state before any event has been applied.
    fn initial(&self) -> S;

    /// The subset of event types this projector cares about. An empty
    /// slice means "every type the query already narrowed down" — the
    /// projector doesn't filter further.
    fn event_types(&self) -> &[&'static str];

    /// Fold one event into the running state.
    fn apply(&self, state: S, event: &StoredEvent, deserializer: &dyn Deserializer) -> S;
}

fn applies_to<S>(projector: &dyn StateProjector<S>, event_type: &str) -> bool {
    let types = projector.event_types();
    types.is_empty() || types.iter().any(|t| *t == event_type)
}

fn fold<S>(
    initial: S,
    start: &Cursor,
    events: &[StoredEvent],
    projectors: &[Box<dyn StateProjector<S>>],
    deserializer: &dyn Deserializer,
) -> (S, Cursor) {
    let mut state = initial;
    let mut end_cursor = start.clone();
    for event in events {
        for projector in projectors {
            if applies_to(projector.as_ref(), &event.event_type) {
                state = projector.apply(state, event, deserializer);
            }
        }
        end_cursor = event.cursor();
    }
    (state, end_cursor)
}

/// Project `query` starting strictly after `start`, through a transactional
/// store handle — the shape command handlers use, since their read and
/// their eventual append share one transaction (§4.4).
pub async fn project<S, T>(
    store: &mut T,
    query: &Query,
    start: &Cursor,
    initial: S,
    projectors: &[Box<dyn StateProjector<S>>],
    deserializer: &dyn Deserializer,
) -> Result<(S, Cursor), crablet_core::CoreError>
where
    T: crablet_eventlog::TransactionalStore + ?Sized,
{
    let after = if start.is_zero() { None } else { Some(start) };
    let events = store.query(query, after).await?;
    Ok(fold(initial, start, &events, projectors, deserializer))
}

/// Project directly off a [`crablet_eventlog::LogStore`], outside any
/// transaction — for read-models and tests that don't need the
/// transactional handle.
pub async fn project_from_log_store<S, L>(
    store: &L,
    query: &Query,
    start: &Cursor,
    initial: S,
    projectors: &[Box<dyn StateProjector<S>>],
    deserializer: &dyn Deserializer,
) -> Result<(S, Cursor), crablet_core::CoreError>
where
    L: crablet_eventlog::LogStore,
{
    let after = if start.is_zero() { None } else { Some(start) };
    let events = store.query(query, after).await?;
    Ok(fold(initial, start, &events, projectors, deserializer))
}
