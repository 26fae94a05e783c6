use thiserror::Error;

use crate::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Cannot build a network without sensor nodes")]
    EmptyNetwork,

    #[error("Unknown node id: {0}")]
    UnknownNode(NodeId),

    #[error("Target {target} does not refer to a node (network has {nodes} nodes)")]
    InvalidTarget { target: NodeId, nodes: usize },

    #[error("Node at position {index} carries id {id}; ids must match their index")]
    MisnumberedNode { index: usize, id: NodeId },
}

/// Result type alias for network construction and queries.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_network_display() {
        assert_eq!(
            NetworkError::EmptyNetwork.to_string(),
            "Cannot build a network without sensor nodes"
        );
    }

    #[test]
    fn invalid_target_display() {
        let e = NetworkError::InvalidTarget {
            target: 12,
            nodes: 10,
        };
        assert!(e.to_string().contains("Target 12"));
    }
}
