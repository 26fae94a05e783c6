//! Reward engine: scores every waypoint for the charger under decision.
//!
//! [`ThreeTermReward`] combines three normalized terms per waypoint `a`:
//!
//! 1. **Self-sustain**: `Σ_i avg_i · p_i(a) / E_i` over requesting nodes.
//!    Favors waypoints close to nodes that drain fast and are nearly empty.
//! 2. **Coverage**: fraction of targets still connected to the base if the
//!    charger goes to `a` and charges for `T(a)`.
//! 3. **Delivery**: `Σ_i w_i · p̂_i(a)`, where `p̂` is the charge share each
//!    request receives and `w_i` how many target paths run through it.
//!
//! Each term is divided by its sum over all waypoints, so a policy mixing
//! terms is not dominated by the one with the largest raw scale.

use std::collections::HashSet;

use super::charging_time::charging_time;
use super::error::{OptimizerError, Result};
use super::Request;
use crate::geometry::Position;
use crate::network::{MobileCharger, Network, RelayPath};
use crate::NodeId;

/// Smoothing added to every fairness count so unused relays keep some weight.
pub const FAIRNESS_EPSILON: f64 = 1e-3;

/// Sums smaller than this cannot be normalized.
pub const NORMALIZATION_EPSILON: f64 = 1e-12;

/// Read-only view of everything a reward strategy may look at.
#[derive(Debug, Clone, Copy)]
pub struct RewardContext<'a> {
    pub network: &'a Network,
    /// The charger being dispatched.
    pub charger: &'a MobileCharger,
    pub waypoints: &'a [Position],
    pub requests: &'a [Request],
    /// Waypoint index the charger currently sits at.
    pub state: usize,
    pub time: f64,
    pub theta: f64,
    /// Index of the depot in `waypoints`.
    pub terminal_state: usize,
}

/// Per-waypoint reward terms.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CandidateReward {
    pub self_sustain: f64,
    pub coverage: f64,
    pub delivery: f64,
    /// Charging duration `T(a)` used to evaluate coverage.
    pub charging_time: f64,
}

impl CandidateReward {
    /// Reward fed to the temporal-difference update.
    pub fn total(&self) -> f64 {
        self.self_sustain + self.coverage + self.delivery
    }
}

/// Computes one reward per waypoint.
pub trait RewardStrategy: Send + Sync {
    /// Scores every waypoint in `ctx.waypoints`, in order.
    ///
    /// # Errors
    ///
    /// [`OptimizerError::DegenerateReward`] when a term cannot be normalized.
    fn evaluate(&self, ctx: &RewardContext<'_>) -> Result<Vec<CandidateReward>>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &str;

    fn boxed_clone(&self) -> Box<dyn RewardStrategy>;
}

impl Clone for Box<dyn RewardStrategy> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// The self-sustain / coverage / delivery reward.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeTermReward;

impl RewardStrategy for ThreeTermReward {
    fn evaluate(&self, ctx: &RewardContext<'_>) -> Result<Vec<CandidateReward>> {
        let paths = ctx.network.target_paths();
        let weights = fairness_weights(&paths, ctx.requests);
        let params = &ctx.network.params;
        let origin = ctx
            .waypoints
            .get(ctx.state)
            .copied()
            .unwrap_or(ctx.charger.current);

        let mut rewards = Vec::with_capacity(ctx.waypoints.len());
        for waypoint in ctx.waypoints {
            let t = charging_time(ctx, waypoint);
            let rates: Vec<f64> = ctx
                .requests
                .iter()
                .map(|r| params.charge_rate_between(waypoint, &ctx.network.nodes[r.id].location))
                .collect();
            let rate_sum: f64 = rates.iter().sum();

            let self_sustain = ctx
                .requests
                .iter()
                .zip(&rates)
                .filter_map(|(r, p)| {
                    let energy = ctx.network.nodes[r.id].energy;
                    (energy > 0.0).then(|| r.avg_energy * p / energy)
                })
                .sum();

            let travel = origin.distance_to(waypoint) / ctx.charger.velocity;
            let dead = predicted_dead(ctx, &rates, travel, t);
            let coverage = if paths.is_empty() {
                0.0
            } else {
                paths.iter().filter(|p| p.is_alive(&dead)).count() as f64 / paths.len() as f64
            };

            let delivery = if rate_sum > 0.0 {
                weights.iter().zip(&rates).map(|(w, p)| w * p / rate_sum).sum()
            } else {
                0.0
            };

            rewards.push(CandidateReward {
                self_sustain,
                coverage,
                delivery,
                charging_time: t,
            });
        }

        normalize(&mut rewards, "self_sustain", |r| &mut r.self_sustain)?;
        normalize(&mut rewards, "coverage", |r| &mut r.coverage)?;
        normalize(&mut rewards, "delivery", |r| &mut r.delivery)?;
        Ok(rewards)
    }

    fn name(&self) -> &str {
        "three_term"
    }

    fn boxed_clone(&self) -> Box<dyn RewardStrategy> {
        Box::new(*self)
    }
}

/// Requests predicted to die by the end of a charge of length `t` after
/// `travel` seconds on the road.
fn predicted_dead(ctx: &RewardContext<'_>, rates: &[f64], travel: f64, t: f64) -> HashSet<NodeId> {
    ctx.requests
        .iter()
        .zip(rates)
        .filter(|(r, p)| {
            let energy = ctx.network.nodes[r.id].energy;
            energy - travel * r.avg_energy + (*p - r.avg_energy) * t < 0.0
        })
        .map(|(r, _)| r.id)
        .collect()
}

/// Normalized count of target paths running through each request.
pub fn fairness_weights(paths: &[RelayPath], requests: &[Request]) -> Vec<f64> {
    let counts: Vec<f64> = requests
        .iter()
        .map(|r| paths.iter().filter(|p| p.contains(r.id)).count() as f64 + FAIRNESS_EPSILON)
        .collect();
    let total: f64 = counts.iter().sum();
    counts.into_iter().map(|c| c / total).collect()
}

/// Divides one term of every reward by its sum across all rewards.
pub fn normalize<F>(rewards: &mut [CandidateReward], term: &'static str, field: F) -> Result<()>
where
    F: Fn(&mut CandidateReward) -> &mut f64,
{
    let sum: f64 = rewards.iter_mut().map(|r| *field(r)).sum();
    if !(sum.abs() > NORMALIZATION_EPSILON && sum.is_finite()) {
        return Err(OptimizerError::DegenerateReward { term, sum });
    }
    for r in rewards.iter_mut() {
        *field(r) /= sum;
    }
    Ok(())
}
