use serde::{Deserialize, Serialize};

/// Parameters of the time-stepped simulation loop. All times are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // --- Horizon ---
    /// Last simulated second.
    pub max_time: u64,
    /// Second at which the action space is built and chargers start working.
    pub activation_time: u64,

    // --- Observability ---
    pub snapshot_interval: u64,
    /// Interval between full checkpoints. Zero disables checkpointing.
    pub checkpoint_interval: u64,

    // --- Burn-rate estimation ---
    /// Idle nodes refresh their energy checkpoint once it is older than this.
    pub refresh_window: u64,
    /// Number of energy checkpoints retained per node.
    pub checkpoint_len: usize,

    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_time: 2_000_000,
            activation_time: 200,
            snapshot_interval: 100,
            checkpoint_interval: 200,
            refresh_window: 50,
            checkpoint_len: 10,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{"max_time": 5000, "seed": 3}"#;
        let cfg: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.max_time, 5000);
        assert_eq!(cfg.seed, 3);
        assert_eq!(cfg.activation_time, 200);
        assert_eq!(cfg.snapshot_interval, 100);
    }
}
