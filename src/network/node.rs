//! Sensor node state: battery, communication neighborhood and energy-rate
//! estimation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;
use crate::optimizer::{QLearning, Request};
use crate::NodeId;

/// Snapshot of a node's battery used to estimate its burn rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCheckpoint {
    /// Simulated second at which the snapshot was taken.
    pub time: u64,
    /// Battery level at that time.
    pub energy: f64,
    /// Energy consumed since the previous snapshot.
    pub used: f64,
}

/// A sensor node.
///
/// # Invariants
///
/// - `0 <= energy <= energy_max`
/// - `level` is assigned at most once by the graph builder (0 = unreachable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub location: Position,
    /// Communication radius.
    pub com_ran: f64,
    pub energy: f64,
    pub energy_max: f64,
    /// Energy level under which the node asks to be charged.
    pub energy_thresh: f64,
    /// Per-second probability that a target node senses and transmits.
    pub prob: f64,
    pub is_active: bool,
    /// Ids of nodes within this node's own communication radius.
    pub neighbor: Vec<NodeId>,
    /// Hop count to the base station (0 = unset).
    pub level: u32,
    pub is_request: bool,
    /// Estimated energy burn rate (joules per second).
    pub avg_energy: f64,
    used_energy: f64,
    check_point: VecDeque<EnergyCheckpoint>,
    len_cp: usize,
}

impl Node {
    /// Default number of retained energy checkpoints.
    pub const DEFAULT_CHECKPOINT_LEN: usize = 10;

    /// Creates a fully charged node.
    pub fn new(
        id: NodeId,
        location: Position,
        com_ran: f64,
        energy_max: f64,
        energy_thresh: f64,
        prob: f64,
    ) -> Self {
        let mut check_point = VecDeque::with_capacity(Self::DEFAULT_CHECKPOINT_LEN);
        check_point.push_back(EnergyCheckpoint {
            time: 0,
            energy: energy_max,
            used: 0.0,
        });
        Self {
            id,
            location,
            com_ran,
            energy: energy_max,
            energy_max,
            energy_thresh,
            prob,
            is_active: true,
            neighbor: Vec::new(),
            level: 0,
            is_request: false,
            avg_energy: 0.0,
            used_energy: 0.0,
            check_point,
            len_cp: Self::DEFAULT_CHECKPOINT_LEN,
        }
    }

    /// Sets the initial battery level, clamped to `[0, energy_max]`.
    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy.clamp(0.0, self.energy_max);
        if let Some(first) = self.check_point.front_mut() {
            first.energy = self.energy;
        }
        self
    }

    /// Sets how many energy checkpoints are kept for rate estimation.
    pub fn with_checkpoint_len(mut self, len_cp: usize) -> Self {
        self.len_cp = len_cp.max(2);
        self
    }

    pub fn is_dead(&self) -> bool {
        self.energy <= 0.0
    }

    /// Removes `amount` joules from the battery, never going below zero.
    pub fn consume(&mut self, amount: f64) {
        let spent = amount.min(self.energy).max(0.0);
        self.energy -= spent;
        self.used_energy += spent;
    }

    /// Adds up to `amount` joules, bounded by the remaining headroom.
    ///
    /// Returns the energy actually stored. Inactive or full nodes accept nothing.
    pub fn charge(&mut self, amount: f64) -> f64 {
        if !self.is_active || self.energy >= self.energy_max - 1e-5 {
            return 0.0;
        }
        let accepted = amount.min(self.energy_max - self.energy).max(0.0);
        self.energy += accepted;
        accepted
    }

    /// Time of the most recent energy checkpoint.
    pub fn last_check_point_time(&self) -> u64 {
        self.check_point.back().map(|cp| cp.time).unwrap_or(0)
    }

    /// Retained energy checkpoints, oldest first.
    pub fn check_points(&self) -> impl Iterator<Item = &EnergyCheckpoint> {
        self.check_point.iter()
    }

    /// Records an energy checkpoint at `t` and refreshes `avg_energy`.
    ///
    /// The burn rate is the energy consumed across all retained checkpoints
    /// divided by the time they span. A checkpoint at the same second as the
    /// previous one is merged into it.
    pub fn set_check_point(&mut self, t: u64) {
        match self.check_point.back_mut() {
            Some(last) if last.time == t => {
                last.energy = self.energy;
                last.used += self.used_energy;
            }
            _ => {
                if self.check_point.len() >= self.len_cp {
                    self.check_point.pop_front();
                }
                self.check_point.push_back(EnergyCheckpoint {
                    time: t,
                    energy: self.energy,
                    used: self.used_energy,
                });
            }
        }
        self.used_energy = 0.0;

        let (first, last) = match (self.check_point.front(), self.check_point.back()) {
            (Some(first), Some(last)) => (first.time, last.time),
            _ => return,
        };
        if last > first {
            // The oldest entry's usage predates the window.
            let used: f64 = self.check_point.iter().skip(1).map(|cp| cp.used).sum();
            self.avg_energy = used / (last - first) as f64;
        }
    }

    /// Signals that this node needs charging.
    ///
    /// Refreshes the energy checkpoint and enqueues a request with the
    /// optimizer unless one is already pending.
    pub fn request(&mut self, optimizer: &mut QLearning, t: u64) {
        self.set_check_point(t);
        if !self.is_request {
            optimizer.push_request(Request {
                id: self.id,
                energy: self.energy,
                avg_energy: self.avg_energy,
                time: t,
            });
            self.is_request = true;
        }
    }
}
