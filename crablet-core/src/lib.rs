//! Crablet Core
//!
//! Shared types for the dynamic consistency boundary (DCB) event store:
//! events, tags, queries, cursors, append conditions, and the error
//! taxonomy every other crate in the workspace builds on.
//!
//! Pure domain logic with zero I/O dependencies — no database driver, no
//! async runtime.

#![warn(clippy::all)]

pub mod command;
pub mod condition;
pub mod cursor;
pub mod deser;
pub mod error;
pub mod event;
pub mod query;
pub mod tags;

pub use command::{CommandResult, ExecutionResult};
pub use condition::AppendCondition;
pub use cursor::Cursor;
pub use deser::{Deserializer, JsonDeserializer};
pub use error::{ConcurrencyKind, CoreError};
pub use event::{NewEvent, StoredEvent};
pub use query::{Query, QueryItem};
pub use tags::{Tag, TagPredicate};
