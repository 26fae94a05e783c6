//! Communication graph: directed neighbor relation and hop levels.
//!
//! The graph is derived once per simulation from node locations and
//! communication radii. An edge `A → B` exists iff `B` lies within `A`'s own
//! radius, so the relation is not symmetric when radii differ.

use std::collections::VecDeque;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::node::Node;
use crate::geometry::Position;
use crate::NodeId;

/// Directed communication graph. Node weights are node ids, edge weights
/// are distances.
pub type CommunicationGraph = DiGraph<NodeId, f64>;

/// Builds the directed communication graph for `nodes`.
///
/// Graph node `i` corresponds to `nodes[i]`.
pub fn build_graph(nodes: &[Node]) -> CommunicationGraph {
    let mut graph = CommunicationGraph::with_capacity(nodes.len(), nodes.len() * 4);
    for node in nodes {
        graph.add_node(node.id);
    }
    for (a, from) in nodes.iter().enumerate() {
        for (b, to) in nodes.iter().enumerate() {
            if a == b {
                continue;
            }
            let d = from.location.distance_to(&to.location);
            if d <= from.com_ran {
                graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), d);
            }
        }
    }
    graph
}

/// Fills every node's neighbor list from the directed graph, in id order.
pub fn set_neighbor(nodes: &mut [Node], graph: &CommunicationGraph) {
    for (i, node) in nodes.iter_mut().enumerate() {
        let mut neighbors: Vec<NodeId> = graph
            .neighbors_directed(NodeIndex::new(i), Direction::Outgoing)
            .map(|n| graph[n])
            .collect();
        neighbors.sort_unstable();
        node.neighbor = neighbors;
    }
}

/// Assigns hop levels by breadth-first propagation from the base station.
///
/// Nodes strictly inside their own radius of `base` get level 1 and seed the
/// queue. A node exactly on its radius still delivers directly to the base
/// but is not a level-1 seed.
/// A node's level, once set, is final; unreachable nodes keep level 0.
/// Running this twice on the same graph leaves every level unchanged.
pub fn set_level(nodes: &mut [Node], graph: &CommunicationGraph, base: &Position) {
    let mut queue = VecDeque::new();
    for (i, node) in nodes.iter_mut().enumerate() {
        if node.location.distance_to(base) < node.com_ran {
            if node.level == 0 {
                node.level = 1;
            }
            queue.push_back(i);
        }
    }

    while let Some(front) = queue.pop_front() {
        let parent_level = nodes[front].level;
        let mut neighbors: Vec<usize> = graph
            .neighbors_directed(NodeIndex::new(front), Direction::Outgoing)
            .map(|n| n.index())
            .collect();
        neighbors.sort_unstable();
        for n in neighbors {
            if nodes[n].level == 0 {
                nodes[n].level = parent_level + 1;
                queue.push_back(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId, x: f64, y: f64, com_ran: f64) -> Node {
        Node::new(id, Position::new(x, y), com_ran, 10.0, 4.0, 0.5)
    }

    fn levels(nodes: &[Node]) -> Vec<u32> {
        nodes.iter().map(|n| n.level).collect()
    }

    #[test]
    fn single_node_in_base_range_has_level_one() {
        let base = Position::new(0.0, 0.0);
        let mut nodes = vec![node(0, 10.0, 0.0, 20.0)];
        let graph = build_graph(&nodes);
        set_neighbor(&mut nodes, &graph);
        set_level(&mut nodes, &graph, &base);
        assert_eq!(nodes[0].level, 1);
        assert!(nodes[0].neighbor.is_empty());
    }

    #[test]
    fn chain_levels_increase_with_hops() {
        let base = Position::new(0.0, 0.0);
        // A reaches the base; B only reaches A.
        let mut nodes = vec![node(0, 15.0, 0.0, 20.0), node(1, 30.0, 0.0, 20.0)];
        let graph = build_graph(&nodes);
        set_neighbor(&mut nodes, &graph);
        set_level(&mut nodes, &graph, &base);
        assert_eq!(levels(&nodes), vec![1, 2]);
    }

    #[test]
    fn neighbor_relation_is_directed() {
        let mut nodes = vec![node(0, 0.0, 0.0, 50.0), node(1, 30.0, 0.0, 10.0)];
        let graph = build_graph(&nodes);
        set_neighbor(&mut nodes, &graph);
        assert_eq!(nodes[0].neighbor, vec![1]);
        assert!(nodes[1].neighbor.is_empty());
    }

    #[test]
    fn unreachable_node_keeps_level_zero() {
        let base = Position::new(0.0, 0.0);
        let mut nodes = vec![node(0, 10.0, 0.0, 20.0), node(1, 500.0, 0.0, 20.0)];
        let graph = build_graph(&nodes);
        set_neighbor(&mut nodes, &graph);
        set_level(&mut nodes, &graph, &base);
        assert_eq!(levels(&nodes), vec![1, 0]);
    }

    #[test]
    fn set_level_is_idempotent() {
        let base = Position::new(0.0, 0.0);
        let mut nodes: Vec<Node> = (0..6)
            .map(|i| node(i, 15.0 * (i as f64 + 1.0), 0.0, 20.0))
            .collect();
        let graph = build_graph(&nodes);
        set_neighbor(&mut nodes, &graph);
        set_level(&mut nodes, &graph, &base);
        let first = levels(&nodes);
        set_level(&mut nodes, &graph, &base);
        assert_eq!(levels(&nodes), first);
        assert_eq!(first, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn node_on_range_boundary_is_not_seeded() {
        let base = Position::new(0.0, 0.0);
        let mut nodes = vec![node(0, 20.0, 0.0, 20.0), node(1, 0.0, 19.0, 20.0)];
        let graph = build_graph(&nodes);
        set_neighbor(&mut nodes, &graph);
        set_level(&mut nodes, &graph, &base);
        // The nodes are out of each other's range.
        assert_eq!(levels(&nodes), vec![0, 1]);
    }
}
