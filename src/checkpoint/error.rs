use std::io;

use thiserror::Error;

/// Errors raised while persisting or restoring a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No checkpoint found at {0}")]
    NotFound(String),
}

/// Result type alias for checkpoint operations.
pub type Result<T> = std::result::Result<T, CheckpointError>;
