use std::io;

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::network::NetworkError;
use crate::optimizer::OptimizerError;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("Failed to write information log: {0}")]
    Log(#[from] io::Error),
}

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;
