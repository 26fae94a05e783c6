use thiserror::Error;

/// Errors raised while partitioning the action space or computing a decision.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Optimizer has not been activated: no action space has been built yet")]
    NotActivated,

    #[error("Optimizer is already active; the action space is built once per simulation")]
    AlreadyActivated,

    #[error("Cannot normalize the {term} reward term: its sum over all waypoints is {sum}")]
    DegenerateReward { term: &'static str, sum: f64 },

    #[error("Cannot partition the network: total sample weight is zero")]
    ZeroPartitionWeight,

    #[error("Cannot build {clusters} clusters from {samples} samples")]
    NotEnoughSamples { samples: usize, clusters: usize },

    #[error("Unknown charger index: {0}")]
    UnknownCharger(usize),

    #[error("State {state} is outside the action space of {len} waypoints")]
    InvalidState { state: usize, len: usize },
}

/// Result type alias for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_reward_names_term() {
        let e = OptimizerError::DegenerateReward {
            term: "coverage",
            sum: 0.0,
        };
        assert!(e.to_string().contains("coverage"));
    }

    #[test]
    fn not_enough_samples_display() {
        let e = OptimizerError::NotEnoughSamples {
            samples: 3,
            clusters: 5,
        };
        assert_eq!(e.to_string(), "Cannot build 5 clusters from 3 samples");
    }

    #[test]
    fn error_equality() {
        assert_eq!(OptimizerError::NotActivated, OptimizerError::NotActivated);
        assert_ne!(
            OptimizerError::NotActivated,
            OptimizerError::ZeroPartitionWeight
        );
    }
}
