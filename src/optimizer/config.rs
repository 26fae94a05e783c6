//! Configuration for the Q-learning charging optimizer.

use serde::{Deserialize, Serialize};

use super::partition::{ClusteringStrategy, DuplicateByRatio, WeightedSample};

/// How node locations are turned into clustering samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionMethod {
    /// One sample per node, weighted by the square root of its burn rate.
    #[default]
    WeightedSample,
    /// Each node repeated in proportion to its burn rate relative to the
    /// lowest non-zero burn rate in the network.
    DuplicateByRatio,
}

impl PartitionMethod {
    /// Returns the clustering strategy implementing this method.
    pub fn strategy(&self) -> Box<dyn ClusteringStrategy> {
        match self {
            PartitionMethod::WeightedSample => Box::new(WeightedSample),
            PartitionMethod::DuplicateByRatio => Box::new(DuplicateByRatio),
        }
    }
}

/// Configuration of the Q-learning optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    // --- Action space ---
    /// Number of clustered charging waypoints (the depot is added on top).
    pub nb_action: usize,
    /// Clustering sample construction.
    pub partition: PartitionMethod,
    /// Seed of the k-means++ initialization.
    pub kmeans_seed: u64,
    /// Upper bound on Lloyd iterations.
    pub kmeans_max_iter: usize,

    // --- Charging-time search ---
    /// Fraction of `energy_max` added to a node's threshold to obtain the
    /// minimum sustainable energy.
    pub theta: f64,

    // --- Temporal-difference update ---
    /// Learning rate.
    pub q_alpha: f64,
    /// Discount factor.
    pub q_gamma: f64,
}

impl QLearningConfig {
    /// Number of states (and actions): waypoints plus the depot.
    pub fn action_dim(&self) -> usize {
        self.nb_action + 1
    }
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            nb_action: 80,
            partition: PartitionMethod::WeightedSample,
            kmeans_seed: 0,
            kmeans_max_iter: 300,
            theta: 0.1,
            q_alpha: 0.5,
            q_gamma: 0.5,
        }
    }
}
