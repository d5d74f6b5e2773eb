//! Crablet Projector
//!
//! Folds a queried slice of the event log into typed state. The read-side
//! counterpart to `crablet-eventlog`'s append path — pure, synchronous
//! transitions driven by an async event stream.

pub mod error;
pub mod projector;

pub use error::{ProjectionError, Result};
pub use projector::{project, project_from_log_store, StateProjector};
