// All-pairs shortest paths (Floyd-Warshall)
//
// Independent of the distributed algorithm; used to check that converged
// distance vectors are actually shortest paths.

use super::cost::add_costs;

/// Shortest path cost between every pair of nodes
///
/// `costs[i][j]` is the direct link cost (`infinity` when there is no link).
/// The result uses the same clamping as the routers: unreachable pairs are
/// exactly `infinity`.
pub fn all_pairs_shortest_paths(costs: &[Vec<u32>], infinity: u32) -> Vec<Vec<u32>> {
    let n = costs.len();
    let mut dist: Vec<Vec<u32>> = costs
        .iter()
        .map(|row| row.iter().map(|&c| c.min(infinity)).collect())
        .collect();

    for (i, row) in dist.iter_mut().enumerate() {
        row[i] = 0;
    }

    for k in 0..n {
        for i in 0..n {
            let via = dist[i][k];
            if via >= infinity {
                continue;
            }
            for j in 0..n {
                let candidate = add_costs(via, dist[k][j], infinity);
                if candidate < dist[i][j] {
                    dist[i][j] = candidate;
                }
            }
        }
    }

    dist
}
