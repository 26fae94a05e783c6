//! The simulated sensor network and its per-second activity.
//!
//! # Module Structure
//!
//! - [`params`] - Radio, geometry and charging constants
//! - [`node`] - Sensor node battery and burn-rate estimation
//! - [`charger`] - Mobile charger mechanics
//! - [`graph`] - Communication graph builder (neighbors and hop levels)
//! - [`routing`] - Relay selection, relay paths and packet delivery

pub mod charger;
pub mod error;
pub mod graph;
pub mod node;
pub mod params;
pub mod routing;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use charger::{ChargerStatus, MobileCharger};
pub use error::NetworkError;
pub use node::{EnergyCheckpoint, Node};
pub use params::NetworkParams;
pub use routing::RelayPath;

use crate::optimizer::{OptimizerError, QLearning};
use crate::NodeId;

/// A wireless rechargeable sensor network.
///
/// Owns every sensor node and mobile charger. The optimizer only borrows the
/// network while it computes a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub nodes: Vec<Node>,
    pub chargers: Vec<MobileCharger>,
    /// Ids of nodes whose data must keep reaching the base.
    pub targets: Vec<NodeId>,
    pub params: NetworkParams,
    /// Whether chargers are being dispatched by the optimizer.
    pub active: bool,
    /// Set once the first target loses its path to the base.
    pub package_lost: bool,
}

impl Network {
    /// Builds a network and derives its communication graph.
    ///
    /// # Errors
    ///
    /// Fails when `nodes` is empty, when a node's id differs from its index,
    /// or when a target does not name a node.
    pub fn new(
        mut nodes: Vec<Node>,
        chargers: Vec<MobileCharger>,
        targets: Vec<NodeId>,
        params: NetworkParams,
    ) -> error::Result<Self> {
        if nodes.is_empty() {
            return Err(NetworkError::EmptyNetwork);
        }
        if let Some((index, node)) = nodes.iter().enumerate().find(|(i, n)| n.id != *i) {
            return Err(NetworkError::MisnumberedNode { index, id: node.id });
        }
        if let Some(&target) = targets.iter().find(|&&t| t >= nodes.len()) {
            return Err(NetworkError::InvalidTarget {
                target,
                nodes: nodes.len(),
            });
        }

        let comm = graph::build_graph(&nodes);
        graph::set_neighbor(&mut nodes, &comm);
        graph::set_level(&mut nodes, &comm, &params.base);

        Ok(Self {
            nodes,
            chargers,
            targets,
            params,
            active: false,
            package_lost: false,
        })
    }

    pub fn node(&self, id: NodeId) -> error::Result<&Node> {
        self.nodes.get(id).ok_or(NetworkError::UnknownNode(id))
    }

    /// Next relay hop for `id`, if any.
    pub fn find_receiver(&self, id: NodeId) -> Option<NodeId> {
        routing::find_receiver(&self.nodes, id)
    }

    /// Current relay path of every target.
    pub fn target_paths(&self) -> Vec<RelayPath> {
        routing::all_paths(&self.nodes, &self.params, &self.targets)
    }

    /// Lets every active target transmit a packet with its own probability.
    pub fn communicate<R: Rng>(&mut self, rng: &mut R) {
        for i in 0..self.targets.len() {
            let target = self.targets[i];
            let node = &self.nodes[target];
            if node.is_active && rng.gen::<f64>() <= node.prob {
                routing::send_package(
                    &mut self.nodes,
                    &self.params,
                    target,
                    self.params.package_size,
                );
            }
        }
    }

    /// Advances the network by one simulated second.
    ///
    /// 1. Targets transmit.
    /// 2. Nodes below their threshold request charging; others clear their flag.
    /// 3. When requests exist, idle nodes refresh stale energy checkpoints.
    /// 4. Once active, every charger (in id order) runs one second of its plan,
    ///    asking the optimizer for a new decision when it is free.
    pub fn run_per_second<R: Rng>(
        &mut self,
        t: u64,
        optimizer: &mut QLearning,
        refresh_window: u64,
        rng: &mut R,
    ) -> Result<(), OptimizerError> {
        self.communicate(rng);

        let mut requested = vec![false; self.nodes.len()];
        for (i, node) in self.nodes.iter_mut().enumerate() {
            if node.energy < node.energy_thresh {
                node.request(optimizer, t);
                requested[i] = true;
            } else {
                node.is_request = false;
            }
        }

        if requested.iter().any(|&r| r) {
            for (node, _) in self
                .nodes
                .iter_mut()
                .zip(&requested)
                .filter(|(_, r)| !**r)
            {
                if t.saturating_sub(node.last_check_point_time()) > refresh_window {
                    node.set_check_point(t);
                }
            }
        }

        if self.active && optimizer.is_active() {
            for i in 0..self.chargers.len() {
                self.run_charger(i, t, optimizer)?;
            }
        }
        Ok(())
    }

    fn run_charger(
        &mut self,
        index: usize,
        t: u64,
        optimizer: &mut QLearning,
    ) -> Result<(), OptimizerError> {
        let mc = &self.chargers[index];
        let job_done = mc.job_done(t);
        if (!mc.is_active && optimizer.has_requests()) || job_done {
            self.chargers[index].is_active = true;
            optimizer.prune_requests(&mut self.nodes);
            if !optimizer.has_requests() {
                self.chargers[index].is_active = false;
            }
            let decision = optimizer.update(index, self, t)?;
            self.chargers[index].state = decision.state;
            self.chargers[index].plan(decision.location, decision.charging_time.value(), t);
        } else {
            let (chargers, nodes) = (&mut self.chargers, &mut self.nodes);
            chargers[index].step(nodes, &self.params);
        }

        let depot = self.params.depot;
        let mc = &mut self.chargers[index];
        if mc.needs_rescue(&self.params) {
            warn!(
                mc = mc.id,
                energy = mc.energy,
                "charger energy below floor, returning to depot"
            );
            mc.return_to_depot(depot, optimizer.terminal_state(), t);
        }
        mc.check_state(&depot);
        Ok(())
    }

    pub fn count_dead_node(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_dead()).count()
    }

    /// Id of the node with the lowest energy (first one on ties).
    pub fn find_min_node(&self) -> NodeId {
        let mut min_id = 0;
        for node in &self.nodes {
            if node.energy < self.nodes[min_id].energy {
                min_id = node.id;
            }
        }
        min_id
    }

    /// Number of targets whose relay path currently reaches the base.
    pub fn count_package(&self) -> usize {
        self.target_paths()
            .iter()
            .filter(|p| p.reaches_base)
            .count()
    }

    pub fn average_energy(&self) -> f64 {
        self.nodes.iter().map(|n| n.energy).sum::<f64>() / self.nodes.len() as f64
    }
}
