//! Mobile charger state and per-second mechanics.
//!
//! A charger alternates between travelling to a waypoint, charging every node
//! around it, and resting at the depot. When it travels and for how long it
//! charges are decided by the optimizer; this module only applies the plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::Node;
use super::params::NetworkParams;
use crate::geometry::Position;

/// What a charger is doing during the current second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargerStatus {
    /// Waiting for requests; free to receive a new decision.
    Idle,
    /// Travelling toward its planned destination.
    Moving,
    /// Standing at a waypoint and charging nearby nodes.
    Charging,
    /// Standing at the depot and recharging itself.
    SelfCharging,
}

impl fmt::Display for ChargerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargerStatus::Idle => write!(f, "idle"),
            ChargerStatus::Moving => write!(f, "moving"),
            ChargerStatus::Charging => write!(f, "charging"),
            ChargerStatus::SelfCharging => write!(f, "self_charging"),
        }
    }
}

/// A mobile charger (MC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileCharger {
    pub id: usize,
    pub energy: f64,
    pub capacity: f64,
    /// Energy spent per second of travel.
    pub e_move: f64,
    /// Energy regained per second at the depot.
    pub e_self_charge: f64,
    /// Distance covered per second.
    pub velocity: f64,
    pub start: Position,
    pub end: Position,
    pub current: Position,
    /// Second at which the current plan (travel + charging) finishes.
    pub end_time: f64,
    /// Second at which the charger reaches `end`.
    pub arrival_time: f64,
    pub moving_time: f64,
    /// Index of the waypoint last chosen for this charger.
    pub state: usize,
    pub is_active: bool,
    pub is_stand: bool,
    pub is_self_charge: bool,
}

impl MobileCharger {
    /// Creates a charger parked at `depot`.
    pub fn new(
        id: usize,
        depot: Position,
        energy: f64,
        capacity: f64,
        e_move: f64,
        e_self_charge: f64,
        velocity: f64,
    ) -> Self {
        Self {
            id,
            energy,
            capacity,
            e_move,
            e_self_charge,
            velocity,
            start: depot,
            end: depot,
            current: depot,
            end_time: -1.0,
            arrival_time: 0.0,
            moving_time: 0.0,
            state: 0,
            is_active: false,
            is_stand: true,
            is_self_charge: true,
        }
    }

    pub fn status(&self) -> ChargerStatus {
        if !self.is_active {
            ChargerStatus::Idle
        } else if !self.is_stand {
            ChargerStatus::Moving
        } else if !self.is_self_charge {
            ChargerStatus::Charging
        } else {
            ChargerStatus::SelfCharging
        }
    }

    /// Travel time from the current location to `destination`.
    pub fn travel_time_to(&self, destination: &Position) -> f64 {
        self.current.distance_to(destination) / self.velocity
    }

    /// Starts a new plan at second `t`: travel to `destination`, then stay
    /// there for `charging_time` seconds.
    pub fn plan(&mut self, destination: Position, charging_time: f64, t: u64) {
        self.start = self.current;
        self.end = destination;
        self.moving_time = self.travel_time_to(&destination);
        self.arrival_time = t as f64 + self.moving_time;
        self.end_time = self.arrival_time + charging_time;
    }

    /// Advances one second toward `end`, paying the movement cost.
    pub fn update_location(&mut self) {
        self.current.move_toward(&self.end, self.velocity);
        self.energy = (self.energy - self.e_move).max(0.0);
    }

    /// Charges every node for one second from the current location.
    ///
    /// Energy delivered to the nodes is drawn from the charger's battery.
    /// Returns the total energy delivered.
    pub fn charge(&mut self, nodes: &mut [Node], params: &NetworkParams) -> f64 {
        let mut delivered = 0.0;
        for node in nodes.iter_mut() {
            if self.energy <= 0.0 {
                break;
            }
            let offered = params
                .charge_rate_between(&self.current, &node.location)
                .min(self.energy);
            let accepted = node.charge(offered);
            self.energy -= accepted;
            delivered += accepted;
        }
        delivered
    }

    /// Recharges the charger's own battery for one second.
    pub fn self_charge(&mut self) {
        self.energy = (self.energy + self.e_self_charge).min(self.capacity);
    }

    /// Applies one second of the current plan.
    pub fn step(&mut self, nodes: &mut [Node], params: &NetworkParams) {
        if !self.is_active {
            return;
        }
        if !self.is_stand {
            self.update_location();
        } else if !self.is_self_charge {
            self.charge(nodes, params);
        } else {
            self.self_charge();
        }
    }

    /// Sends the charger straight to the depot for a full recharge.
    pub fn return_to_depot(&mut self, depot: Position, terminal_state: usize, t: u64) {
        let charging_time = self.capacity / self.e_self_charge;
        self.start = self.current;
        self.end = depot;
        self.is_stand = false;
        self.state = terminal_state;
        self.moving_time = self.travel_time_to(&depot);
        self.arrival_time = t as f64 + self.moving_time;
        self.end_time = self.arrival_time + charging_time;
    }

    /// Whether the current plan is over at second `t`.
    ///
    /// A plan ends within one second of `end_time`. An active charger whose
    /// `end_time` has already passed by a full second is also done, so a
    /// zero-length plan cannot leave it busy forever.
    pub fn job_done(&self, t: u64) -> bool {
        let t = t as f64;
        (t - self.end_time).abs() < 1.0 || (self.is_active && t >= self.end_time + 1.0)
    }

    /// Whether the charger is below the energy floor and not yet headed home.
    pub fn needs_rescue(&self, params: &NetworkParams) -> bool {
        self.energy < params.mc_energy_floor
            && !self.is_self_charge
            && self.end.distance_to(&params.depot) > 1e-3
    }

    /// Updates standing/self-charging flags after the second's movement.
    ///
    /// Arrival snaps the charger onto its destination when within one unit.
    pub fn check_state(&mut self, depot: &Position) {
        if self.current.distance_to(&self.end) < 1.0 {
            self.is_stand = true;
            self.current = self.end;
        } else {
            self.is_stand = false;
        }
        self.is_self_charge = depot.distance_to(&self.end) < 1e-3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charger() -> MobileCharger {
        MobileCharger::new(0, Position::origin(), 100.0, 108.0, 1.0, 5.0, 5.0)
    }

    #[test]
    fn new_charger_is_idle_at_depot() {
        let mc = charger();
        assert_eq!(mc.status(), ChargerStatus::Idle);
        assert_eq!(mc.current, Position::origin());
    }

    #[test]
    fn plan_sets_timing() {
        let mut mc = charger();
        mc.plan(Position::new(30.0, 40.0), 20.0, 100);
        assert!((mc.moving_time - 10.0).abs() < 1e-12);
        assert!((mc.arrival_time - 110.0).abs() < 1e-12);
        assert!((mc.end_time - 130.0).abs() < 1e-12);
    }

    #[test]
    fn moves_then_charges() {
        let params = NetworkParams::default();
        let mut nodes =
            vec![Node::new(0, Position::new(10.0, 0.0), 20.0, 10.0, 4.0, 0.5).with_energy(2.0)];
        let mut mc = charger();
        mc.is_active = true;
        mc.plan(Position::new(10.0, 0.0), 5.0, 0);
        mc.check_state(&params.depot);
        assert_eq!(mc.status(), ChargerStatus::Moving);

        mc.step(&mut nodes, &params);
        mc.check_state(&params.depot);
        assert_eq!(mc.status(), ChargerStatus::Moving);
        assert!((mc.energy - 99.0).abs() < 1e-12);

        mc.step(&mut nodes, &params);
        mc.check_state(&params.depot);
        assert_eq!(mc.status(), ChargerStatus::Charging);
        assert_eq!(mc.current, Position::new(10.0, 0.0));

        let before = mc.energy;
        mc.step(&mut nodes, &params);
        let gained = nodes[0].energy - 2.0;
        assert!((gained - params.charge_rate(0.0)).abs() < 1e-12);
        assert!((before - mc.energy - gained).abs() < 1e-12);
    }

    #[test]
    fn self_charge_is_capped() {
        let mut mc = charger();
        mc.energy = 106.0;
        mc.self_charge();
        assert_eq!(mc.energy, mc.capacity);
    }

    #[test]
    fn low_energy_charger_returns_home() {
        let params = NetworkParams::default();
        let mut mc = charger();
        mc.is_active = true;
        mc.current = Position::new(50.0, 0.0);
        mc.end = Position::new(60.0, 0.0);
        mc.is_self_charge = false;
        mc.energy = 4.0;
        assert!(mc.needs_rescue(&params));
        mc.return_to_depot(params.depot, 80, 10);
        assert_eq!(mc.state, 80);
        assert_eq!(mc.end, params.depot);
        assert!((mc.end_time - (10.0 + 10.0 + 108.0 / 5.0)).abs() < 1e-9);
        mc.check_state(&params.depot);
        assert!(!mc.needs_rescue(&params));
    }

    #[test]
    fn job_ends_near_end_time() {
        let mut mc = charger();
        mc.is_active = true;
        mc.plan(Position::new(10.0, 0.0), 28.4, 100);
        assert!(!mc.job_done(101));
        assert!(mc.job_done(130));
        assert!(!charger().job_done(0));
    }

    #[test]
    fn zero_length_plan_still_ends() {
        let mut mc = charger();
        mc.is_active = true;
        mc.plan(mc.current, 0.0, 40);
        assert!(mc.job_done(41));
        assert!(mc.job_done(55));
    }
}
