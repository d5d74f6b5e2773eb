//! Projection errors (§4.3).

use crablet_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
