//! Charging-duration search for a candidate waypoint.
//!
//! For a charger parked at waypoint `a`, every node `j` sees its energy evolve
//! after arrival as `E'_j + (p_j − avg_j)·t`, where `E'_j` is its energy at
//! arrival (burn during travel deducted, energy from other chargers added) and
//! `p_j` the rate received from `a`. The search picks the duration `t` at
//! which the fewest nodes sit under their minimum sustainable energy.

use super::reward::RewardContext;
use crate::geometry::Position;
use crate::network::{ChargerStatus, Node};

/// Node whose energy crosses its minimum at some positive charging time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Crossing {
    /// Energy at arrival.
    arrival_energy: f64,
    /// Net rate once charging: received minus burned.
    net_rate: f64,
    energy_min: f64,
}

impl Crossing {
    fn time(&self) -> f64 {
        (self.energy_min - self.arrival_energy) / self.net_rate
    }

    fn is_short(&self, t: f64) -> bool {
        self.arrival_energy + self.net_rate * t < self.energy_min
    }
}

/// Minimum energy a node must keep: its request threshold plus `theta` of its
/// capacity.
pub fn energy_min(node: &Node, theta: f64) -> f64 {
    node.energy_thresh + theta * node.energy_max
}

/// Charging duration at `waypoint` for the charger under decision.
///
/// Returns 0 when no node crosses its minimum at any positive time.
pub fn charging_time(ctx: &RewardContext<'_>, waypoint: &Position) -> f64 {
    let params = &ctx.network.params;
    let time_move = ctx.charger.travel_time_to(waypoint);

    let mut needs_charge = Vec::new();
    let mut overshoot = Vec::new();
    for node in &ctx.network.nodes {
        let e_min = energy_min(node, ctx.theta);
        let p = params.charge_rate_between(waypoint, &node.location);
        let crossing = Crossing {
            arrival_energy: node.energy - time_move * node.avg_energy
                + peer_contribution(ctx, node),
            net_rate: p - node.avg_energy,
            energy_min: e_min,
        };
        if crossing.arrival_energy < e_min && crossing.net_rate > 0.0 {
            needs_charge.push(crossing);
        } else if crossing.arrival_energy > e_min && crossing.net_rate < 0.0 {
            overshoot.push(crossing);
        }
    }

    // Nodes needing charge are tried first, so ties favor their times.
    let crossings: Vec<Crossing> = needs_charge.into_iter().chain(overshoot).collect();
    let mut best: Option<(f64, usize)> = None;
    for candidate in crossings.iter().map(Crossing::time) {
        let short = crossings.iter().filter(|c| c.is_short(candidate)).count();
        match best {
            Some((_, fewest)) if fewest <= short => {}
            _ => best = Some((candidate, short)),
        }
    }
    best.map(|(t, _)| t).unwrap_or(0.0)
}

/// Energy `node` will receive from the other chargers' current plans.
fn peer_contribution(ctx: &RewardContext<'_>, node: &Node) -> f64 {
    let params = &ctx.network.params;
    ctx.network
        .chargers
        .iter()
        .filter(|other| other.id != ctx.charger.id)
        .map(|other| match other.status() {
            ChargerStatus::Charging => {
                params.charge_rate_between(&other.current, &node.location)
                    * (other.end_time - ctx.time).max(0.0)
            }
            ChargerStatus::Moving if other.state != ctx.terminal_state => {
                params.charge_rate_between(&other.end, &node.location)
                    * (other.end_time - other.arrival_time).max(0.0)
            }
            _ => 0.0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{MobileCharger, Network, NetworkParams};

    fn network(nodes: Vec<Node>, chargers: Vec<MobileCharger>) -> Network {
        let params = NetworkParams {
            base: Position::new(0.0, 0.0),
            depot: Position::new(0.0, 0.0),
            // Rate 0.5 at zero distance keeps the crossing times exact.
            charge_alpha: 450.0,
            ..NetworkParams::default()
        };
        let targets = (0..nodes.len()).collect();
        Network::new(nodes, chargers, targets, params).unwrap()
    }

    fn ctx<'a>(net: &'a Network, waypoints: &'a [Position]) -> RewardContext<'a> {
        RewardContext {
            network: net,
            charger: &net.chargers[0],
            waypoints,
            requests: &[],
            state: 0,
            time: 0.0,
            theta: 0.0,
            terminal_state: waypoints.len() - 1,
        }
    }

    fn node_at(id: usize, x: f64, energy: f64, avg: f64) -> Node {
        let mut n =
            Node::new(id, Position::new(x, 0.0), 20.0, 100.0, 50.0, 1.0).with_energy(energy);
        n.avg_energy = avg;
        n
    }

    /// Charger standing on the first waypoint, at (10, 0).
    fn parked(id: usize) -> MobileCharger {
        MobileCharger::new(id, Position::new(10.0, 0.0), 100.0, 100.0, 1.0, 5.0, 5.0)
    }

    /// Peer travelling to (10, 0), arriving at 2 s and charging until 7 s.
    fn moving_peer(state: usize) -> MobileCharger {
        let mut peer = MobileCharger::new(1, Position::origin(), 100.0, 100.0, 1.0, 5.0, 5.0);
        peer.is_active = true;
        peer.is_stand = false;
        peer.is_self_charge = false;
        peer.end = Position::new(10.0, 0.0);
        peer.arrival_time = 2.0;
        peer.end_time = 7.0;
        peer.state = state;
        peer
    }

    #[test]
    fn energy_min_adds_theta_share() {
        let n = node_at(0, 0.0, 10.0, 0.0);
        assert!((energy_min(&n, 0.1) - 60.0).abs() < 1e-12);
    }

    #[test]
    fn time_fills_single_node_to_minimum() {
        let nodes = vec![node_at(0, 10.0, 20.0, 0.0)];
        let chargers = vec![parked(0)];
        let net = network(nodes, chargers);
        let wps = [Position::new(10.0, 0.0), Position::origin()];
        let p = net.params.charge_rate(0.0);
        let t = charging_time(&ctx(&net, &wps), &wps[0]);
        assert!((t - 30.0 / p).abs() < 1e-9);
    }

    #[test]
    fn no_crossing_means_zero_time() {
        let nodes = vec![node_at(0, 10.0, 90.0, 0.0)];
        let chargers = vec![parked(0)];
        let net = network(nodes, chargers);
        let wps = [Position::new(10.0, 0.0), Position::origin()];
        assert_eq!(charging_time(&ctx(&net, &wps), &wps[0]), 0.0);
    }

    #[test]
    fn picks_time_with_fewest_nodes_short() {
        // Two nodes below their minimum at different depths: the longer fill
        // time brings both above.
        let nodes = vec![node_at(0, 10.0, 40.0, 0.0), node_at(1, 10.0, 20.0, 0.0)];
        let chargers = vec![parked(0)];
        let net = network(nodes, chargers);
        let wps = [Position::new(10.0, 0.0), Position::origin()];
        let p = net.params.charge_rate(0.0);
        let t = charging_time(&ctx(&net, &wps), &wps[0]);
        assert!((t - 30.0 / p).abs() < 1e-9);
    }

    #[test]
    fn charging_peer_counts_toward_arrival_energy() {
        let nodes = vec![node_at(0, 10.0, 20.0, 0.0)];
        let mut peer = parked(1);
        peer.is_active = true;
        peer.is_stand = true;
        peer.is_self_charge = false;
        peer.end = peer.current;
        peer.end_time = 5.0;
        let chargers = vec![parked(0), peer];
        let net = network(nodes, chargers);
        let wps = [Position::new(10.0, 0.0), Position::origin()];
        let p = net.params.charge_rate(0.0);
        let t = charging_time(&ctx(&net, &wps), &wps[0]);
        assert!((t - (30.0 - 5.0 * p) / p).abs() < 1e-9);
    }

    #[test]
    fn moving_peer_counts_its_planned_charge() {
        let nodes = vec![node_at(0, 10.0, 20.0, 0.0)];
        let net = network(nodes, vec![parked(0), moving_peer(0)]);
        let wps = [Position::new(10.0, 0.0), Position::origin()];
        let p = net.params.charge_rate(0.0);
        let t = charging_time(&ctx(&net, &wps), &wps[0]);
        assert!((t - (30.0 - 5.0 * p) / p).abs() < 1e-9);
    }

    #[test]
    fn peer_headed_to_depot_contributes_nothing() {
        let nodes = vec![node_at(0, 10.0, 20.0, 0.0)];
        let net = network(nodes, vec![parked(0), moving_peer(1)]);
        let wps = [Position::new(10.0, 0.0), Position::origin()];
        let p = net.params.charge_rate(0.0);
        let t = charging_time(&ctx(&net, &wps), &wps[0]);
        assert!((t - 30.0 / p).abs() < 1e-9);
    }

    #[test]
    fn ties_favor_nodes_needing_charge() {
        // Node 0 drains far from the waypoint and crosses its minimum first;
        // node 1 fills up at the waypoint. Either time leaves one node short.
        let nodes = vec![node_at(0, 1000.0, 80.0, 1.0), node_at(1, 10.0, 20.0, 0.0)];
        let net = network(nodes, vec![parked(0)]);
        let wps = [Position::new(10.0, 0.0), Position::origin()];
        let p = net.params.charge_rate(0.0);
        let t = charging_time(&ctx(&net, &wps), &wps[0]);
        assert!((t - 30.0 / p).abs() < 1e-9);
    }
}
