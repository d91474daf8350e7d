// Read-only view of a routing node, plus its text rendering

use super::cost::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column width used for every cost and node id in the rendered table
const CELL_WIDTH: usize = 3;

/// Owned copy of a node's tables at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingSnapshot {
    pub id: NodeId,
    /// Logical time the snapshot was taken
    pub clock: u64,
    pub infinity: u32,
    pub distance_vector: Vec<u32>,
    pub next_hop: Vec<Option<NodeId>>,
    /// Last vector advertised by each neighbor
    pub neighbor_vectors: BTreeMap<NodeId, Vec<u32>>,
    /// Current direct link cost to each neighbor
    pub link_costs: BTreeMap<NodeId, u32>,
}

impl RoutingSnapshot {
    pub fn num_nodes(&self) -> usize {
        self.distance_vector.len()
    }

    /// Destinations this node currently has a route to (excluding itself)
    pub fn reachable(&self) -> usize {
        self.next_hop.iter().filter(|hop| hop.is_some()).count()
    }
}

fn write_row<I>(f: &mut fmt::Formatter<'_>, label: &str, cells: I) -> fmt::Result
where
    I: IntoIterator<Item = String>,
{
    write!(f, "{:>7} |", label)?;
    for cell in cells {
        write!(f, "{:>width$}", cell, width = CELL_WIDTH)?;
    }
    writeln!(f)
}

fn write_header(f: &mut fmt::Formatter<'_>, num_nodes: usize) -> fmt::Result {
    write_row(f, "dst", (0..num_nodes).map(|d| d.to_string()))?;
    writeln!(f, "{}", "-".repeat(9 + num_nodes * CELL_WIDTH))
}

impl fmt::Display for RoutingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.num_nodes();

        writeln!(f, "Current state for router {} at time {}", self.id, self.clock)?;
        writeln!(f)?;
        writeln!(f, "Distancetable:")?;
        write_header(f, n)?;
        write_row(
            f,
            &format!("nbr {}", self.id),
            self.distance_vector.iter().map(u32::to_string),
        )?;
        for (neighbor, vector) in &self.neighbor_vectors {
            write_row(
                f,
                &format!("nbr {}", neighbor),
                vector.iter().map(u32::to_string),
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Our distance vector and routes:")?;
        write_header(f, n)?;
        write_row(f, "cost", self.distance_vector.iter().map(u32::to_string))?;
        write_row(
            f,
            "route",
            self.next_hop
                .iter()
                .map(|hop| hop.map_or_else(|| "-".to_string(), |h| h.to_string())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RoutingSnapshot {
        RoutingSnapshot {
            id: 0,
            clock: 17,
            infinity: 999,
            distance_vector: vec![0, 2, 1],
            next_hop: vec![None, Some(2), Some(2)],
            neighbor_vectors: BTreeMap::from([(1, vec![4, 0, 999]), (2, vec![999, 1, 0])]),
            link_costs: BTreeMap::from([(1, 4), (2, 1)]),
        }
    }

    #[test]
    fn test_render_table() {
        let rendered = sample().to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "Current state for router 0 at time 17");
        assert_eq!(lines[3], "    dst |  0  1  2");
        assert_eq!(lines[5], "  nbr 0 |  0  2  1");
        assert_eq!(lines[6], "  nbr 1 |  4  0999");
        assert_eq!(lines[7], "  nbr 2 |999  1  0");
        assert!(rendered.contains("   cost |  0  2  1"));
        assert!(rendered.ends_with("  route |  -  2  2\n"));
    }

    #[test]
    fn test_reachable_count() {
        assert_eq!(sample().reachable(), 2);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["next_hop"][0], serde_json::Value::Null);
        assert_eq!(json["next_hop"][1], 2);
    }
}
