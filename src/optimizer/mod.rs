//! Q-learning optimizer that dispatches mobile chargers.
//!
//! # Module Structure
//!
//! - [`config`] - Optimizer hyperparameters and partition method
//! - [`q_table`] - Square table of learned move values
//! - [`partition`] - Sample construction for the action-space clustering
//! - [`kmeans`] - Weighted k-means++ clustering
//! - [`reward`] - Per-waypoint reward terms
//! - [`charging_time`] - Charging-duration search
//!
//! # Decision cycle
//!
//! The action space is built once by [`QLearning::net_partition`]: k-means
//! centroids over node locations, plus the depot as the last (terminal)
//! waypoint. Afterwards, each time a charger is free, [`QLearning::update`]
//! scores every waypoint, applies one temporal-difference update to the row
//! of the charger's current waypoint and picks the best next waypoint.

pub mod charging_time;
pub mod config;
pub mod error;
pub mod kmeans;
pub mod partition;
pub mod q_table;
pub mod reward;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use config::{PartitionMethod, QLearningConfig};
pub use error::OptimizerError;
pub use kmeans::WeightedPoint;
pub use partition::{ClusteringStrategy, DuplicateByRatio, WeightedSample};
pub use q_table::QTable;
pub use reward::{CandidateReward, RewardContext, RewardStrategy, ThreeTermReward};

use crate::geometry::Position;
use crate::network::{Network, Node};
use crate::units::{seconds, Seconds};
use crate::NodeId;

/// A charging request raised by a node under its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: NodeId,
    /// Energy when the request was raised.
    pub energy: f64,
    /// Burn rate when the request was raised.
    pub avg_energy: f64,
    pub time: u64,
}

/// Where a charger goes next and how long it stays there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Index of the chosen waypoint.
    pub state: usize,
    pub location: Position,
    pub charging_time: Seconds,
    pub travel_time: Seconds,
}

fn default_reward() -> Box<dyn RewardStrategy> {
    Box::new(ThreeTermReward)
}

/// Q-learning charging optimizer.
///
/// Holds the waypoints, the Q-table and the pending requests. It never owns
/// the network: decisions borrow it read-only.
#[derive(Clone, Serialize, Deserialize)]
pub struct QLearning {
    pub config: QLearningConfig,
    /// Charging waypoints; the depot is the last entry once activated.
    waypoints: Vec<Position>,
    q_table: QTable,
    requests: Vec<Request>,
    #[serde(skip, default = "default_reward")]
    reward: Box<dyn RewardStrategy>,
    /// Terms of the most recent evaluation, kept for inspection.
    #[serde(skip)]
    last_rewards: Vec<CandidateReward>,
}

impl QLearning {
    pub fn new(config: QLearningConfig) -> Self {
        Self::with_reward(config, Box::new(ThreeTermReward))
    }

    /// Creates an optimizer scoring waypoints with a custom reward strategy.
    pub fn with_reward(config: QLearningConfig, reward: Box<dyn RewardStrategy>) -> Self {
        let size = config.action_dim();
        Self {
            config,
            waypoints: Vec::new(),
            q_table: QTable::new(size),
            requests: Vec::new(),
            reward,
            last_rewards: Vec::new(),
        }
    }

    /// Whether the action space has been built.
    pub fn is_active(&self) -> bool {
        !self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Position] {
        &self.waypoints
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn last_rewards(&self) -> &[CandidateReward] {
        &self.last_rewards
    }

    /// Index of the depot waypoint.
    pub fn terminal_state(&self) -> usize {
        self.config.nb_action
    }

    /// Queues a request. A node already queued keeps its original entry.
    pub fn push_request(&mut self, request: Request) {
        if !self.requests.iter().any(|r| r.id == request.id) {
            self.requests.push(request);
        }
    }

    /// Drops requests whose node has recovered above its threshold, or died,
    /// and clears their request flag. A dead node can no longer be charged.
    pub fn prune_requests(&mut self, nodes: &mut [Node]) {
        let before = self.requests.len();
        self.requests.retain(|r| match nodes.get_mut(r.id) {
            Some(node) if node.energy >= node.energy_thresh || node.is_dead() => {
                node.is_request = false;
                false
            }
            Some(_) => true,
            None => false,
        });
        if self.requests.len() != before {
            debug!(
                pruned = before - self.requests.len(),
                pending = self.requests.len(),
                "recovered requests pruned"
            );
        }
    }

    /// Builds the action space from the network's current burn rates.
    ///
    /// Every node first records an energy checkpoint at `t` so its burn rate
    /// is up to date. Clustering yields `nb_action` waypoints, truncated to
    /// integer coordinates, and the depot is appended. Every charger is placed
    /// at the depot state.
    ///
    /// # Errors
    ///
    /// Fails when called twice, or when clustering fails (no node burns
    /// energy, or fewer samples than waypoints).
    pub fn net_partition(&mut self, network: &mut Network, t: u64) -> error::Result<()> {
        if self.is_active() {
            return Err(OptimizerError::AlreadyActivated);
        }
        for node in network.nodes.iter_mut() {
            node.set_check_point(t);
        }

        let strategy = self.config.partition.strategy();
        let samples = strategy.samples(&network.nodes)?;
        let centers = kmeans::kmeans(
            &samples,
            self.config.nb_action,
            self.config.kmeans_seed,
            self.config.kmeans_max_iter,
        )?;

        let mut waypoints: Vec<Position> = centers.iter().map(Position::truncated).collect();
        waypoints.push(network.params.depot);
        self.waypoints = waypoints;
        self.q_table = QTable::new(self.config.action_dim());

        let terminal = self.terminal_state();
        for mc in network.chargers.iter_mut() {
            mc.state = terminal;
        }
        info!(
            strategy = strategy.name(),
            samples = samples.len(),
            waypoints = self.waypoints.len(),
            t,
            "action space partitioned"
        );
        Ok(())
    }

    /// Decides the next waypoint and charging time for charger `index`.
    ///
    /// With no pending request the charger stays where it is for zero seconds
    /// and the Q-table is left untouched.
    ///
    /// # Errors
    ///
    /// Fails when the optimizer is not active, when `index` names no charger
    /// or its state is outside the action space, or when the reward terms
    /// cannot be normalized.
    pub fn update(&mut self, index: usize, network: &Network, t: u64) -> error::Result<Decision> {
        if !self.is_active() {
            return Err(OptimizerError::NotActivated);
        }
        let mc = network
            .chargers
            .get(index)
            .ok_or(OptimizerError::UnknownCharger(index))?;
        let state = mc.state;
        let here = *self.waypoints.get(state).ok_or(OptimizerError::InvalidState {
            state,
            len: self.waypoints.len(),
        })?;

        if self.requests.is_empty() {
            return Ok(Decision {
                state,
                location: here,
                charging_time: seconds(0.0),
                travel_time: seconds(mc.travel_time_to(&here)),
            });
        }

        let ctx = RewardContext {
            network,
            charger: mc,
            waypoints: &self.waypoints,
            requests: &self.requests,
            state,
            time: t as f64,
            theta: self.config.theta,
            terminal_state: self.terminal_state(),
        };
        let rewards = self.reward.evaluate(&ctx)?;
        for (a, r) in rewards.iter().enumerate() {
            debug!(
                mc = mc.id,
                waypoint = a,
                self_sustain = r.self_sustain,
                coverage = r.coverage,
                delivery = r.delivery,
                charging_time = r.charging_time,
                "candidate reward"
            );
        }
        let totals: Vec<f64> = rewards.iter().map(CandidateReward::total).collect();
        self.q_table
            .update_row(state, &totals, self.config.q_alpha, self.config.q_gamma);

        let next = self.choose_next_state(mc.id, mc.energy, network.params.mc_energy_floor, state);
        let charging_time = if next == self.terminal_state() {
            (mc.capacity - mc.energy) / mc.e_self_charge
        } else {
            rewards[next].charging_time
        };
        let location = self.waypoints[next];
        let travel_time = mc.travel_time_to(&location);
        self.last_rewards = rewards;

        info!(
            mc = mc.id,
            t,
            from = state,
            to = next,
            x = location.x,
            y = location.y,
            charging_time,
            travel_time,
            requests = self.requests.len(),
            "charger dispatched"
        );
        Ok(Decision {
            state: next,
            location,
            charging_time: seconds(charging_time),
            travel_time: seconds(travel_time),
        })
    }

    /// Best next waypoint from `state`, or the depot when the charger is low.
    fn choose_next_state(&self, mc: usize, energy: f64, floor: f64, state: usize) -> usize {
        if energy < floor {
            warn!(
                mc,
                energy,
                floor,
                "charger energy below floor, heading to depot"
            );
            return self.terminal_state();
        }
        self.q_table.best_action(state)
    }
}

impl Default for QLearning {
    fn default() -> Self {
        Self::new(QLearningConfig::default())
    }
}

impl fmt::Debug for QLearning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QLearning")
            .field("config", &self.config)
            .field("reward", &self.reward.name())
            .field("waypoints", &self.waypoints.len())
            .field("requests", &self.requests.len())
            .finish()
    }
}
