//! Multi-hop relaying toward the base station.
//!
//! Routing is greedy over hop levels: a node forwards to its nearest active
//! neighbor that sits strictly closer (in hops) to the base. Relay chains are
//! walked iteratively with a hop bound equal to the number of nodes, so an
//! accidental routing cycle ends the walk instead of looping forever.

use std::collections::HashSet;

use super::node::Node;
use super::params::NetworkParams;
use crate::NodeId;

/// The chain of nodes a packet from a given source traverses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPath {
    /// Node ids in traversal order, starting with the source.
    pub nodes: Vec<NodeId>,
    /// Whether the last node hands the packet to the base station.
    pub reaches_base: bool,
}

impl RelayPath {
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// A path is alive when it reaches the base and avoids every node in `dead`.
    pub fn is_alive(&self, dead: &HashSet<NodeId>) -> bool {
        self.reaches_base && !self.nodes.iter().any(|id| dead.contains(id))
    }
}

/// Returns whether `node` can hand packets directly to the base station.
pub fn in_base_range(node: &Node, params: &NetworkParams) -> bool {
    node.location.distance_to(&params.base) <= node.com_ran
}

/// Next relay hop for `nodes[id]`, or `None` when no forwarder exists.
pub fn find_receiver(nodes: &[Node], id: NodeId) -> Option<NodeId> {
    let node = nodes.get(id)?;
    if !node.is_active {
        return None;
    }
    let mut best: Option<(NodeId, f64)> = None;
    for &n in &node.neighbor {
        let candidate = &nodes[n];
        if !candidate.is_active || candidate.level == 0 || candidate.level >= node.level {
            continue;
        }
        let d = node.location.distance_to(&candidate.location);
        match best {
            Some((_, best_d)) if best_d <= d => {}
            _ => best = Some((n, d)),
        }
    }
    best.map(|(n, _)| n)
}

/// Follows the relay chain from `source` until the base or a dead end.
///
/// An inactive node is a dead end, even when it is within range of the base.
pub fn relay_path(nodes: &[Node], params: &NetworkParams, source: NodeId) -> RelayPath {
    let mut path = Vec::new();
    let mut current = source;
    for _ in 0..=nodes.len() {
        let Some(node) = nodes.get(current) else {
            break;
        };
        if path.contains(&current) {
            break;
        }
        path.push(current);
        if !node.is_active {
            break;
        }
        if in_base_range(node, params) {
            return RelayPath {
                nodes: path,
                reaches_base: true,
            };
        }
        match find_receiver(nodes, current) {
            Some(next) => current = next,
            None => break,
        }
    }
    RelayPath {
        nodes: path,
        reaches_base: false,
    }
}

/// Relay paths of every target, in target order.
pub fn all_paths(nodes: &[Node], params: &NetworkParams, targets: &[NodeId]) -> Vec<RelayPath> {
    targets
        .iter()
        .map(|&t| relay_path(nodes, params, t))
        .collect()
}

/// Delivers one packet of `bits` from `source`, charging every hop for
/// transmission and reception.
///
/// Returns the path actually travelled.
pub fn send_package(
    nodes: &mut [Node],
    params: &NetworkParams,
    source: NodeId,
    bits: f64,
) -> RelayPath {
    let mut path = Vec::new();
    let mut current = source;
    let mut reaches_base = false;

    for _ in 0..=nodes.len() {
        if current >= nodes.len() || path.contains(&current) {
            break;
        }
        path.push(current);
        if in_base_range(&nodes[current], params) {
            let d = nodes[current].location.distance_to(&params.base);
            nodes[current].consume(params.transmit_cost(bits, d));
            reaches_base = true;
            break;
        }
        match find_receiver(nodes, current) {
            Some(next) => {
                let d = nodes[current]
                    .location
                    .distance_to(&nodes[next].location);
                nodes[current].consume(params.transmit_cost(bits, d));
                nodes[next].consume(params.receive_cost(bits));
                current = next;
            }
            None => break,
        }
    }

    for &id in &path {
        check_active(nodes, params, id);
    }

    RelayPath {
        nodes: path,
        reaches_base,
    }
}

/// Refreshes `nodes[id].is_active`.
///
/// A dead node is inactive. A live node stays active while it can reach the
/// base directly or has at least one active neighbor.
pub fn check_active(nodes: &mut [Node], params: &NetworkParams, id: NodeId) {
    let active = {
        let node = &nodes[id];
        !node.is_dead()
            && (in_base_range(node, params) || node.neighbor.iter().any(|&n| nodes[n].is_active))
    };
    nodes[id].is_active = active;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Position;
    use crate::network::graph::{build_graph, set_level, set_neighbor};

    fn params() -> NetworkParams {
        NetworkParams {
            base: Position::new(0.0, 0.0),
            ..NetworkParams::default()
        }
    }

    fn chain(n: usize) -> Vec<Node> {
        let mut nodes: Vec<Node> = (0..n)
            .map(|i| {
                let x = 15.0 * (i as f64 + 1.0);
                Node::new(i, Position::new(x, 0.0), 20.0, 10.0, 4.0, 1.0)
            })
            .collect();
        let graph = build_graph(&nodes);
        set_neighbor(&mut nodes, &graph);
        set_level(&mut nodes, &graph, &params().base);
        nodes
    }

    #[test]
    fn receiver_is_lower_level_neighbor() {
        let nodes = chain(3);
        assert_eq!(find_receiver(&nodes, 2), Some(1));
        assert_eq!(find_receiver(&nodes, 1), Some(0));
        assert_eq!(find_receiver(&nodes, 0), None);
    }

    #[test]
    fn inactive_node_has_no_receiver() {
        let mut nodes = chain(3);
        nodes[2].is_active = false;
        assert_eq!(find_receiver(&nodes, 2), None);
    }

    #[test]
    fn path_reaches_base() {
        let nodes = chain(4);
        let path = relay_path(&nodes, &params(), 3);
        assert_eq!(path.nodes, vec![3, 2, 1, 0]);
        assert!(path.reaches_base);
        assert!(path.is_alive(&HashSet::new()));
        assert!(!path.is_alive(&HashSet::from([1])));
    }

    #[test]
    fn broken_relay_ends_path() {
        let mut nodes = chain(3);
        nodes[1].is_active = false;
        let path = relay_path(&nodes, &params(), 2);
        assert_eq!(path.nodes, vec![2]);
        assert!(!path.reaches_base);
    }

    #[test]
    fn inactive_source_never_reaches_base() {
        let mut nodes = chain(2);
        nodes[0].is_active = false;
        let path = relay_path(&nodes, &params(), 0);
        assert_eq!(path.nodes, vec![0]);
        assert!(!path.reaches_base);
    }

    #[test]
    fn path_stops_where_no_forwarder_exists() {
        let mut nodes = chain(2);
        nodes[0].location = Position::new(100.0, 0.0);
        nodes[1].location = Position::new(110.0, 0.0);
        nodes[0].neighbor = vec![1];
        nodes[1].neighbor = vec![0];
        nodes[0].level = 3;
        nodes[1].level = 2;
        let path = relay_path(&nodes, &params(), 0);
        assert_eq!(path.nodes, vec![0, 1]);
        assert!(!path.reaches_base);
    }

    #[test]
    fn sending_spends_energy_along_path() {
        let mut nodes = chain(3);
        let p = params();
        let path = send_package(&mut nodes, &p, 2, p.package_size);
        assert!(path.reaches_base);
        assert!(nodes.iter().all(|n| n.energy < n.energy_max));
        // The source pays only for transmitting.
        let expected = nodes[2].energy_max - p.transmit_cost(p.package_size, 15.0);
        assert!((nodes[2].energy - expected).abs() < 1e-12);
    }

    #[test]
    fn dead_node_becomes_inactive() {
        let mut nodes = chain(2);
        nodes[1].energy = 0.0;
        check_active(&mut nodes, &params(), 1);
        assert!(!nodes[1].is_active);
    }
}
