//! Crablet Command Executor
//!
//! The transactional envelope around deciding and appending: handlers are
//! registered once by `command_type()`, and the executor drives
//! project → decide → append under a single transaction per command.
//!
//! # Architecture
//!
//! ```text
//! Command envelope → Executor → CommandHandler::handle → append_if → ExecutionResult
//! ```
//!
//! # Components
//!
//! - **Handler**: the `CommandHandler` trait, one impl per command type
//! - **Executor**: drives the registered handlers against a `LogStore`
//!
//! # Example
//!
//! ```rust,ignore
//! use crablet_exec::Executor;
//! use crablet_eventlog::MemoryLogStore;
//!
//! let executor = Executor::new(MemoryLogStore::new(), vec![Box::new(OpenWallet)])?;
//! let result = executor.execute(command).await?;
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod executor;
pub mod handler;

pub use error::{ExecError, ExecResult};
pub use executor::Executor;
pub use handler::CommandHandler;
