//! Cost vectors with a saturating `INFINITY` sentinel.
//!
//! Costs are plain `u32`s. Any value at or above the network's `infinity`
//! means "unreachable", and every sum is clamped there, so a finite cost
//! plus `infinity` is `infinity` and nothing ever wraps.

use serde::{Deserialize, Serialize};

/// Index of a router in `0..num_nodes`
pub type NodeId = usize;

/// Add two costs, clamping the result at `infinity`
pub fn add_costs(a: u32, b: u32, infinity: u32) -> u32 {
    if a >= infinity || b >= infinity {
        return infinity;
    }
    a.saturating_add(b).min(infinity)
}

/// Fixed-size per-destination cost estimates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostVector {
    costs: Vec<u32>,
    infinity: u32,
}

impl CostVector {
    /// Every destination unreachable
    pub fn unreachable(len: usize, infinity: u32) -> Self {
        Self {
            costs: vec![infinity; len],
            infinity,
        }
    }

    /// Wrap raw costs; anything above `infinity` is clamped to it
    pub fn from_costs(costs: &[u32], infinity: u32) -> Self {
        Self {
            costs: costs.iter().map(|&c| c.min(infinity)).collect(),
            infinity,
        }
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn infinity(&self) -> u32 {
        self.infinity
    }

    /// Cost to `dest`. Out-of-range destinations are unreachable.
    pub fn get(&self, dest: NodeId) -> u32 {
        self.costs.get(dest).copied().unwrap_or(self.infinity)
    }

    pub fn set(&mut self, dest: NodeId, cost: u32) {
        if let Some(slot) = self.costs.get_mut(dest) {
            *slot = cost.min(self.infinity);
        }
    }

    pub fn is_reachable(&self, dest: NodeId) -> bool {
        self.get(dest) < self.infinity
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.costs
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.costs.clone()
    }

    /// Copy of this vector with every destination matching `poison` set to `infinity`
    pub fn poisoned<F>(&self, poison: F) -> Vec<u32>
    where
        F: Fn(NodeId) -> bool,
    {
        self.costs
            .iter()
            .enumerate()
            .map(|(dest, &cost)| if poison(dest) { self.infinity } else { cost })
            .collect()
    }
}
