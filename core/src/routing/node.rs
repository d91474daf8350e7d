//! Routing node: one router's view of the network
//!
//! A node keeps:
//! - the direct cost of each link to a neighbor
//! - the last full vector each neighbor advertised (keyed by neighbor id)
//! - its own distance vector and next hop per destination
//!
//! Every inbound event is one step: update local state, recompute the
//! distance vector from scratch, and re-advertise only if something moved.
//!
//! Route selection: a candidate replaces the current best only when it is
//! strictly cheaper. The direct link is considered first, then neighbors in
//! ascending id order, so ties go to the direct link and then to the lowest
//! neighbor id. Selection never looks at the previous next hop, which makes
//! the converged table a function of the link costs and neighbor vectors
//! alone.

use super::cost::{add_costs, CostVector, NodeId};
use super::message::UpdateMessage;
use super::port::{SchedulerPort, SimParams};
use super::snapshot::RoutingSnapshot;
use crate::{Result, RoutingError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What an inbound event did to the node
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Accepted; the distance vector did not move, nothing was sent
    Unchanged,
    /// Accepted; the table changed and the new vector was sent to every neighbor
    Propagated,
    /// Malformed or unknown input; state untouched
    Rejected(RoutingError),
}

impl UpdateOutcome {
    pub fn propagated(&self) -> bool {
        matches!(self, UpdateOutcome::Propagated)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, UpdateOutcome::Rejected(_))
    }
}

pub struct RoutingNode {
    id: NodeId,
    params: SimParams,
    /// Neighbor -> direct link cost. The key set is the neighbor set.
    link_costs: BTreeMap<NodeId, u32>,
    /// Neighbor -> last vector it advertised to us
    neighbor_vectors: BTreeMap<NodeId, CostVector>,
    distance_vector: CostVector,
    next_hop: Vec<Option<NodeId>>,
    port: Arc<dyn SchedulerPort>,
}

impl RoutingNode {
    /// Build the node from its direct link costs and announce the initial vector
    ///
    /// `direct_costs[j]` is the cost of the link to `j`, `infinity` when there
    /// is none, and must be `0` at `id`.
    pub fn new(id: NodeId, direct_costs: &[u32], port: Arc<dyn SchedulerPort>) -> Result<Self> {
        let params = port.params();
        let infinity = params.infinity;

        if id >= params.num_nodes {
            return Err(RoutingError::InvalidNodeId {
                id,
                num_nodes: params.num_nodes,
            });
        }
        if direct_costs.len() != params.num_nodes {
            return Err(RoutingError::VectorLength {
                expected: params.num_nodes,
                got: direct_costs.len(),
            });
        }
        if direct_costs[id] != 0 {
            return Err(RoutingError::NonZeroSelfCost {
                id,
                cost: direct_costs[id],
            });
        }

        let link_costs: BTreeMap<NodeId, u32> = direct_costs
            .iter()
            .enumerate()
            .filter(|&(j, &cost)| j != id && cost < infinity)
            .map(|(j, &cost)| (j, cost))
            .collect();

        let neighbor_vectors = link_costs
            .keys()
            .map(|&n| (n, CostVector::unreachable(params.num_nodes, infinity)))
            .collect();

        let mut distance_vector = CostVector::from_costs(direct_costs, infinity);
        distance_vector.set(id, 0);

        let next_hop = (0..params.num_nodes)
            .map(|j| link_costs.contains_key(&j).then_some(j))
            .collect();

        let node = Self {
            id,
            params,
            link_costs,
            neighbor_vectors,
            distance_vector,
            next_hop,
            port,
        };

        debug!(
            "Router {} initialized with neighbors {:?}",
            node.id,
            node.link_costs.keys().collect::<Vec<_>>()
        );
        node.propagate();

        Ok(node)
    }

    /// Handle a distance vector advertised by a neighbor
    pub fn recv_update(&mut self, message: UpdateMessage) -> UpdateOutcome {
        let source = message.source;
        match self.store_neighbor_vector(message) {
            Ok(()) => self.recompute_and_propagate(),
            Err(e) => {
                warn!("Router {} rejected update from {}: {}", self.id, source, e);
                UpdateOutcome::Rejected(e)
            }
        }
    }

    /// Change the cost of the direct link to `dest`
    ///
    /// A cost of `infinity` takes the link down; `dest` stays a neighbor so
    /// the link can come back later.
    pub fn update_link_cost(&mut self, dest: NodeId, new_cost: u32) -> UpdateOutcome {
        let infinity = self.params.infinity;
        let Some(cost) = self.link_costs.get_mut(&dest) else {
            let e = RoutingError::NotANeighbor {
                from: self.id,
                to: dest,
            };
            warn!("Router {} rejected link cost change: {}", self.id, e);
            return UpdateOutcome::Rejected(e);
        };

        debug!(
            "Router {} link to {} cost {} -> {}",
            self.id, dest, *cost, new_cost
        );
        *cost = new_cost.min(infinity);

        self.recompute_and_propagate()
    }

    /// Read-only copy of the node's tables for display
    pub fn snapshot(&self) -> RoutingSnapshot {
        RoutingSnapshot {
            id: self.id,
            clock: self.port.clock(),
            infinity: self.params.infinity,
            distance_vector: self.distance_vector.to_vec(),
            next_hop: self.next_hop.clone(),
            neighbor_vectors: self
                .neighbor_vectors
                .iter()
                .map(|(&n, v)| (n, v.to_vec()))
                .collect(),
            link_costs: self.link_costs.clone(),
        }
    }

    /// The vector this node advertises to `neighbor`, poisoned if enabled
    pub fn outgoing_vector(&self, neighbor: NodeId) -> Option<Vec<u32>> {
        if !self.link_costs.contains_key(&neighbor) {
            return None;
        }
        if self.params.poison_reverse {
            Some(
                self.distance_vector
                    .poisoned(|dest| self.next_hop[dest] == Some(neighbor)),
            )
        } else {
            Some(self.distance_vector.to_vec())
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn params(&self) -> SimParams {
        self.params
    }

    /// Neighbor ids in ascending order
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.link_costs.keys().copied()
    }

    pub fn is_neighbor(&self, node: NodeId) -> bool {
        self.link_costs.contains_key(&node)
    }

    pub fn link_cost(&self, neighbor: NodeId) -> Option<u32> {
        self.link_costs.get(&neighbor).copied()
    }

    pub fn distance_vector(&self) -> &CostVector {
        &self.distance_vector
    }

    pub fn cost_to(&self, dest: NodeId) -> u32 {
        self.distance_vector.get(dest)
    }

    pub fn next_hop(&self, dest: NodeId) -> Option<NodeId> {
        self.next_hop.get(dest).copied().flatten()
    }

    fn store_neighbor_vector(&mut self, message: UpdateMessage) -> Result<()> {
        let expected = self.params.num_nodes;
        let Some(slot) = self.neighbor_vectors.get_mut(&message.source) else {
            return Err(RoutingError::UnknownNeighbor(message.source));
        };
        if message.vector.len() != expected {
            return Err(RoutingError::VectorLength {
                expected,
                got: message.vector.len(),
            });
        }

        // Full replace, never a merge
        *slot = CostVector::from_costs(&message.vector, self.params.infinity);
        Ok(())
    }

    fn recompute_and_propagate(&mut self) -> UpdateOutcome {
        if self.recompute() {
            self.propagate();
            UpdateOutcome::Propagated
        } else {
            UpdateOutcome::Unchanged
        }
    }

    /// Bellman-Ford step over the current link costs and neighbor vectors
    ///
    /// Returns whether any cost or next hop changed.
    fn recompute(&mut self) -> bool {
        let infinity = self.params.infinity;
        let mut changed = false;

        for dest in 0..self.params.num_nodes {
            if dest == self.id {
                continue;
            }

            let (mut best, mut best_hop) = match self.link_costs.get(&dest) {
                Some(&cost) if cost < infinity => (cost, Some(dest)),
                _ => (infinity, None),
            };

            for (&neighbor, &link) in &self.link_costs {
                let advertised = self
                    .neighbor_vectors
                    .get(&neighbor)
                    .map_or(infinity, |v| v.get(dest));
                let candidate = add_costs(link, advertised, infinity);
                if candidate < best {
                    best = candidate;
                    best_hop = Some(neighbor);
                }
            }

            if best != self.distance_vector.get(dest) || best_hop != self.next_hop[dest] {
                debug!(
                    "Router {} route to {}: cost {} via {:?} -> cost {} via {:?}",
                    self.id,
                    dest,
                    self.distance_vector.get(dest),
                    self.next_hop[dest],
                    best,
                    best_hop
                );
                self.distance_vector.set(dest, best);
                self.next_hop[dest] = best_hop;
                changed = true;
            }
        }

        changed
    }

    /// Send the current vector to every neighbor
    fn propagate(&self) {
        for neighbor in self.neighbors() {
            let Some(vector) = self.outgoing_vector(neighbor) else {
                continue;
            };
            debug!("Router {} -> {}: {:?}", self.id, neighbor, vector);
            self.port.send(neighbor, UpdateMessage::new(self.id, vector));
        }
    }
}

impl fmt::Debug for RoutingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingNode")
            .field("id", &self.id)
            .field("link_costs", &self.link_costs)
            .field("distance_vector", &self.distance_vector.as_slice())
            .field("next_hop", &self.next_hop)
            .finish_non_exhaustive()
    }
}
