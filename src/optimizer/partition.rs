//! Clustering strategies that turn node locations into k-means samples.
//!
//! Both strategies bias the waypoints toward nodes that burn energy faster;
//! they differ in how that bias is expressed.

use super::error::{OptimizerError, Result};
use super::kmeans::WeightedPoint;
use crate::network::Node;

/// Upper bound on how many copies of one node [`DuplicateByRatio`] emits.
pub const MAX_DUPLICATES: usize = 10_000;

/// Builds clustering samples from the current node state.
pub trait ClusteringStrategy: Send + Sync {
    /// Produces the weighted samples fed to k-means.
    ///
    /// # Errors
    ///
    /// [`OptimizerError::ZeroPartitionWeight`] when no node has a positive
    /// burn rate.
    fn samples(&self, nodes: &[Node]) -> Result<Vec<WeightedPoint>>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &str;
}

/// One sample per node with weight `sqrt(avg) / ‖sqrt(avg)‖₂`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSample;

impl ClusteringStrategy for WeightedSample {
    fn samples(&self, nodes: &[Node]) -> Result<Vec<WeightedPoint>> {
        // ‖sqrt(avg)‖₂ = sqrt(Σ avg)
        let norm = nodes
            .iter()
            .map(|n| n.avg_energy.max(0.0))
            .sum::<f64>()
            .sqrt();
        if !(norm > 0.0 && norm.is_finite()) {
            return Err(OptimizerError::ZeroPartitionWeight);
        }
        Ok(nodes
            .iter()
            .map(|n| WeightedPoint::new(n.location, n.avg_energy.max(0.0).sqrt() / norm))
            .collect())
    }

    fn name(&self) -> &str {
        "weighted_sample"
    }
}

/// Each node repeated `floor(avg / min_avg)` times with unit weight, where
/// `min_avg` is the lowest positive burn rate. Idle nodes are left out.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateByRatio;

impl ClusteringStrategy for DuplicateByRatio {
    fn samples(&self, nodes: &[Node]) -> Result<Vec<WeightedPoint>> {
        let min_avg = nodes
            .iter()
            .map(|n| n.avg_energy)
            .filter(|&a| a > 0.0)
            .fold(f64::INFINITY, f64::min);
        if !min_avg.is_finite() {
            return Err(OptimizerError::ZeroPartitionWeight);
        }

        let mut samples = Vec::new();
        for node in nodes.iter().filter(|n| n.avg_energy > 0.0) {
            let copies = ((node.avg_energy / min_avg).floor() as usize).clamp(1, MAX_DUPLICATES);
            samples.extend(std::iter::repeat(WeightedPoint::new(node.location, 1.0)).take(copies));
        }
        Ok(samples)
    }

    fn name(&self) -> &str {
        "duplicate_by_ratio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;

    fn node(id: usize, x: f64, avg: f64) -> Node {
        let mut n = Node::new(id, Position::new(x, 0.0), 20.0, 10.0, 4.0, 1.0);
        n.avg_energy = avg;
        n
    }

    #[test]
    fn weighted_sample_normalizes_weights() {
        let nodes = vec![node(0, 0.0, 1.0), node(1, 10.0, 4.0), node(2, 20.0, 0.0)];
        let samples = WeightedSample.samples(&nodes).unwrap();
        assert_eq!(samples.len(), 3);
        let sq: f64 = samples.iter().map(|s| s.weight * s.weight).sum();
        assert!((sq - 1.0).abs() < 1e-12);
        assert!((samples[1].weight / samples[0].weight - 2.0).abs() < 1e-12);
        assert_eq!(samples[2].weight, 0.0);
    }

    #[test]
    fn duplicate_by_ratio_repeats_busy_nodes() {
        let nodes = vec![node(0, 0.0, 0.5), node(1, 10.0, 1.6), node(2, 20.0, 0.0)];
        let samples = DuplicateByRatio.samples(&nodes).unwrap();
        let at = |x: f64| samples.iter().filter(|s| s.position.x == x).count();
        assert_eq!(at(0.0), 1);
        assert_eq!(at(10.0), 3);
        assert_eq!(at(20.0), 0);
    }

    #[test]
    fn idle_network_cannot_be_partitioned() {
        let nodes = vec![node(0, 0.0, 0.0), node(1, 10.0, 0.0)];
        assert_eq!(
            WeightedSample.samples(&nodes).unwrap_err(),
            OptimizerError::ZeroPartitionWeight
        );
        assert_eq!(
            DuplicateByRatio.samples(&nodes).unwrap_err(),
            OptimizerError::ZeroPartitionWeight
        );
    }
}
