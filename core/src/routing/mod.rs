//! Distance-Vector Routing
//!
//! Per-node implementation of distributed Bellman-Ford:
//! - Cost: fixed-size cost vectors with a saturating `INFINITY` sentinel
//! - Port: the narrow capability set a node needs from its scheduler
//! - Message: the `{source, vector}` update exchanged between neighbors
//! - Node: table state, recompute step and (poison-reverse) propagation
//! - Snapshot: read-only view of a node for display
//! - Paths: all-pairs shortest paths, used to check converged tables

pub mod cost;
pub mod message;
pub mod node;
pub mod paths;
pub mod port;
pub mod snapshot;

pub use cost::{CostVector, NodeId};
pub use message::{decode_update, encode_update, UpdateMessage, MAX_NODES, MAX_UPDATE_SIZE};
pub use node::{RoutingNode, UpdateOutcome};
pub use paths::all_pairs_shortest_paths;
pub use port::{SchedulerPort, SimParams};
pub use snapshot::RoutingSnapshot;
