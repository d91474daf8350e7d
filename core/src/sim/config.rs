// Simulation configuration
//
// Stored as JSON, e.g.
//
// {
//   "infinity": 999,
//   "poison_reverse": true,
//   "costs": [[0, 4, 1], [4, 0, 50], [1, 50, 0]],
//   "link_changes": [{ "time": 40, "a": 0, "b": 1, "cost": 60 }]
// }

use crate::routing::{NodeId, SimParams, MAX_NODES};
use crate::{Result, RoutingError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the simulator orders deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Event queue with random per-packet delay, FIFO per directed link
    #[default]
    Async,
    /// Lock-step rounds: everything sent in round k arrives in round k+1
    Rounds,
}

/// A scheduled change of a link's cost (applied to both directions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChange {
    /// Logical time at which the change happens
    pub time: u64,
    pub a: NodeId,
    pub b: NodeId,
    /// New cost; `infinity` takes the link down
    pub cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Cost sentinel for "unreachable"
    #[serde(default = "default_infinity")]
    pub infinity: u32,

    /// Enable poison reverse on every router
    #[serde(default = "default_poison_reverse")]
    pub poison_reverse: bool,

    /// Symmetric link cost matrix; `infinity` where there is no link
    pub costs: Vec<Vec<u32>>,

    /// Link cost changes injected during the run
    #[serde(default)]
    pub link_changes: Vec<LinkChange>,

    /// Seed for delivery delays
    #[serde(default)]
    pub seed: u64,

    /// Upper bound of the per-packet delay in async mode
    #[serde(default = "default_max_delay")]
    pub max_delay: u64,

    /// Stop after this many events even if messages are still in flight
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    #[serde(default)]
    pub mode: RunMode,
}

fn default_infinity() -> u32 {
    999
}

fn default_poison_reverse() -> bool {
    true
}

fn default_max_delay() -> u64 {
    3
}

fn default_max_events() -> usize {
    100_000
}

impl SimConfig {
    /// Config for the given cost matrix with every other field defaulted
    pub fn new(costs: Vec<Vec<u32>>) -> Self {
        Self {
            infinity: default_infinity(),
            poison_reverse: default_poison_reverse(),
            costs,
            link_changes: Vec::new(),
            seed: 0,
            max_delay: default_max_delay(),
            max_events: default_max_events(),
            mode: RunMode::default(),
        }
    }

    /// Three routers with a cheap 0-1 link that later becomes expensive
    ///
    /// Without poison reverse this counts to infinity for a long while
    /// before settling.
    pub fn sample() -> Self {
        let mut config = Self::new(vec![vec![0, 4, 1], vec![4, 0, 50], vec![1, 50, 0]]);
        config.link_changes.push(LinkChange {
            time: 40,
            a: 0,
            b: 1,
            cost: 60,
        });
        config
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn num_nodes(&self) -> usize {
        self.costs.len()
    }

    pub fn params(&self) -> SimParams {
        SimParams::new(self.num_nodes(), self.infinity, self.poison_reverse)
    }

    /// Whether `a` and `b` share a link in the initial topology
    pub fn has_link(&self, a: NodeId, b: NodeId) -> bool {
        a != b
            && self
                .costs
                .get(a)
                .and_then(|row| row.get(b))
                .is_some_and(|&cost| cost < self.infinity)
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.num_nodes();

        if n == 0 {
            return Err(invalid("cost matrix is empty"));
        }
        if n > MAX_NODES {
            return Err(invalid(format!("{} nodes (max {})", n, MAX_NODES)));
        }
        if self.infinity == 0 {
            return Err(invalid("infinity must be positive"));
        }
        if self.max_delay == 0 {
            return Err(invalid("max_delay must be at least 1"));
        }

        for (i, row) in self.costs.iter().enumerate() {
            if row.len() != n {
                return Err(invalid(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if row[i] != 0 {
                return Err(invalid(format!("cost from {} to itself is {}", i, row[i])));
            }
        }

        for i in 0..n {
            for j in (i + 1)..n {
                let forward = self.costs[i][j].min(self.infinity);
                let backward = self.costs[j][i].min(self.infinity);
                if forward != backward {
                    return Err(invalid(format!(
                        "link {}-{} is asymmetric ({} vs {})",
                        i, j, forward, backward
                    )));
                }
            }
        }

        for change in &self.link_changes {
            if change.a >= n || change.b >= n {
                return Err(invalid(format!(
                    "link change {}-{} references an unknown node",
                    change.a, change.b
                )));
            }
            if !self.has_link(change.a, change.b) {
                return Err(invalid(format!(
                    "link change {}-{} is not on an existing link",
                    change.a, change.b
                )));
            }
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> RoutingError {
    RoutingError::InvalidConfig(msg.into())
}
