// DV Routing Core: distributed Bellman-Ford with poison reverse
//
// Every simulated router runs a RoutingNode. Nodes only talk to each other
// through the SchedulerPort they were handed at construction; the bundled
// Simulator is one such scheduler.

pub mod routing;
pub mod sim;

use thiserror::Error;

pub use routing::{
    all_pairs_shortest_paths, decode_update, encode_update, CostVector, NodeId, RoutingNode,
    RoutingSnapshot, SchedulerPort, SimParams, UpdateMessage, UpdateOutcome,
};
pub use sim::{LinkChange, RunMode, SimConfig, SimReport, Simulator};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Vector length mismatch: expected {expected} entries, got {got}")]
    VectorLength { expected: usize, got: usize },

    #[error("Node {0} is not a neighbor")]
    UnknownNeighbor(NodeId),

    #[error("Node {from} has no link to node {to}")]
    NotANeighbor { from: NodeId, to: NodeId },

    #[error("Invalid node id {id} (network has {num_nodes} nodes)")]
    InvalidNodeId { id: NodeId, num_nodes: usize },

    #[error("Cost to self must be 0 for node {id}, got {cost}")]
    NonZeroSelfCost { id: NodeId, cost: u32 },

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Update too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = RoutingError> = std::result::Result<T, E>;

/// Install a `tracing` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. Safe to call more than once.
pub fn init_logging(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init();
}
