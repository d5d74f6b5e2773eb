//! Event Log
//!
//! The append-only, globally ordered log at the center of the dynamic
//! consistency boundary: conditional append (`appendIf`), the tag/type
//! query compiler, and the transactional handle command handlers read and
//! write through.
//!
//! Two backends ship here: [`PostgresLogStore`] for production and
//! [`MemoryLogStore`] for dependency-free unit tests. Both implement
//! [`LogStore`] and are interchangeable to callers.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query_sql;
pub mod store;
pub mod validate;

pub use error::EventLogError;
pub use memory::MemoryLogStore;
pub use postgres::{PgTransactionalStore, PostgresLogStore};
pub use store::{BoxFuture, LogStore, TransactionalStore};
