//! Crablet Daemon Library
//!
//! Process wiring for the outbox: configuration, the polling loop, and the
//! `db` CLI subcommands live here; everything else is a library crate.
//!
//! # Architecture
//!
//! ```text
//! Config::from_env() → PostgresLogStore + PostgresProgressStore → OutboxProcessor → Daemon::run()
//! ```
//!
//! # Components
//!
//! - **Daemon**: the polling loop that drives `OutboxProcessor::run_cycle`
//! - **Config**: environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use crabletd::{Config, Daemon};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     // build an OutboxProcessor and pass it to Daemon::new(config, processor)
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod daemon;
pub mod error;

pub use config::{Config, Environment, OutboxConfig};
pub use daemon::Daemon;
pub use error::{DaemonError, DaemonResult};
