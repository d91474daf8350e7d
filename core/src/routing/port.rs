//! Scheduler port: what a node may ask of whoever is driving it
//!
//! A node never owns or reaches into its scheduler. It gets an
//! `Arc<dyn SchedulerPort>` at construction and uses exactly three things:
//! the simulation constants, the logical clock and `send`.

use super::cost::NodeId;
use super::message::UpdateMessage;
use serde::{Deserialize, Serialize};

/// Simulation constants shared by every node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimParams {
    /// Number of routers in the network
    pub num_nodes: usize,
    /// Cost sentinel for "unreachable"
    pub infinity: u32,
    /// Advertise `infinity` back to the neighbor a route goes through
    pub poison_reverse: bool,
}

impl SimParams {
    pub fn new(num_nodes: usize, infinity: u32, poison_reverse: bool) -> Self {
        Self {
            num_nodes,
            infinity,
            poison_reverse,
        }
    }
}

/// Capabilities the scheduler exposes to a routing node
#[cfg_attr(test, mockall::automock)]
pub trait SchedulerPort: Send + Sync {
    /// Simulation constants
    fn params(&self) -> SimParams;

    /// Current logical time (display only)
    fn clock(&self) -> u64;

    /// Hand an update to the transport for delivery to neighbor `to`
    fn send(&self, to: NodeId, message: UpdateMessage);
}
