//! Weighted k-means over planar points.
//!
//! Centers are seeded with k-means++ from a seeded [`StdRng`], then refined
//! by Lloyd iterations until no center moves by more than [`TOLERANCE`] or
//! the iteration bound is reached.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::{OptimizerError, Result};
use crate::geometry::Position;

/// Largest center shift still considered converged.
pub const TOLERANCE: f64 = 1e-6;

/// A clustering sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    pub position: Position,
    pub weight: f64,
}

impl WeightedPoint {
    pub fn new(position: Position, weight: f64) -> Self {
        Self { position, weight }
    }
}

/// Clusters `points` into `k` weighted centroids.
///
/// # Errors
///
/// - [`OptimizerError::NotEnoughSamples`] when fewer than `k` points are given.
/// - [`OptimizerError::ZeroPartitionWeight`] when the weights do not sum to a
///   positive finite value.
pub fn kmeans(
    points: &[WeightedPoint],
    k: usize,
    seed: u64,
    max_iter: usize,
) -> Result<Vec<Position>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    if points.len() < k {
        return Err(OptimizerError::NotEnoughSamples {
            samples: points.len(),
            clusters: k,
        });
    }
    let total: f64 = points.iter().map(|p| p.weight).sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(OptimizerError::ZeroPartitionWeight);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut centers = seed_centers(points, k, &mut rng);
    let mut labels = vec![0usize; points.len()];

    for _ in 0..max_iter {
        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest(&centers, &point.position).0;
        }

        let mut sums = vec![(0.0, 0.0, 0.0); k];
        for (&label, point) in labels.iter().zip(points) {
            let s = &mut sums[label];
            s.0 += point.weight * point.position.x;
            s.1 += point.weight * point.position.y;
            s.2 += point.weight;
        }

        let mut shift: f64 = 0.0;
        for (center, &(sx, sy, w)) in centers.iter_mut().zip(&sums) {
            // An empty cluster keeps its previous center.
            if w <= 0.0 {
                continue;
            }
            let updated = Position::new(sx / w, sy / w);
            shift = shift.max(center.distance_to(&updated));
            *center = updated;
        }
        if shift <= TOLERANCE {
            break;
        }
    }

    Ok(centers)
}

/// k-means++ seeding: each new center is drawn with probability proportional
/// to `weight × squared distance` to the closest center chosen so far.
fn seed_centers(points: &[WeightedPoint], k: usize, rng: &mut StdRng) -> Vec<Position> {
    let weights: Vec<f64> = points.iter().map(|p| p.weight).collect();
    let mut centers = Vec::with_capacity(k);
    centers.push(points[sample_index(&weights, rng)].position);

    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| p.position.distance_to(&centers[0]).powi(2))
        .collect();

    while centers.len() < k {
        let scores: Vec<f64> = weights.iter().zip(&closest).map(|(w, d)| w * d).collect();
        // All remaining mass sits on existing centers: fall back to weights.
        let index = if scores.iter().sum::<f64>() > 0.0 {
            sample_index(&scores, rng)
        } else {
            sample_index(&weights, rng)
        };
        let center = points[index].position;
        for (d, p) in closest.iter_mut().zip(points) {
            *d = d.min(p.position.distance_to(&center).powi(2));
        }
        centers.push(center);
    }
    centers
}

/// Draws an index with probability proportional to `weights`.
fn sample_index(weights: &[f64], rng: &mut StdRng) -> usize {
    let total: f64 = weights.iter().sum();
    let mut r = rng.gen::<f64>() * total;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        if r < w {
            return i;
        }
        r -= w;
        last_positive = i;
    }
    last_positive
}

/// Index of and distance to the center closest to `p` (first on ties).
fn nearest(centers: &[Position], p: &Position) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = c.distance_to(p);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}
