//! Reference Scheduler: discrete-event driver for routing nodes
//!
//! Builds one `RoutingNode` per router, all sharing a single `Layer2` port,
//! then feeds them packets and link-cost changes:
//! - **Async**: every frame gets a random delay (seeded), arrivals on one
//!   directed link never overtake each other, link changes fire at their
//!   configured times
//! - **Rounds**: lock-step exchange; settles, then applies each link change
//!   and settles again
//!
//! A run ends when nothing is left in flight (converged) or when the event
//! budget is spent. The latter is how count-to-infinity shows up.

pub mod config;
pub mod network;

pub use config::{LinkChange, RunMode, SimConfig};
pub use network::{Frame, Layer2};

use crate::routing::{
    all_pairs_shortest_paths, decode_update, NodeId, RoutingNode, RoutingSnapshot, SchedulerPort,
};
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a simulation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimReport {
    pub mode: RunMode,
    /// Nothing left in flight when the run stopped
    pub converged: bool,
    /// Deliveries plus link changes processed
    pub events: usize,
    pub messages_delivered: usize,
    /// Frames lost to encoding/decoding problems or missing links
    pub frames_dropped: u64,
    /// Delivery rounds (rounds mode only)
    pub rounds: usize,
    pub final_clock: u64,
}

/// A node whose converged cost disagrees with the shortest-path oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub node: NodeId,
    pub dest: NodeId,
    pub expected: u32,
    pub actual: u32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "router {} -> {}: expected cost {}, has {}",
            self.node, self.dest, self.expected, self.actual
        )
    }
}

#[derive(Debug)]
enum Event {
    Deliver(Frame),
    LinkChange(LinkChange),
}

#[derive(Debug)]
struct Scheduled {
    time: u64,
    seq: u64,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

pub struct Simulator {
    config: SimConfig,
    /// Current link costs (initial matrix plus applied changes)
    topology: Vec<Vec<u32>>,
    layer2: Arc<Layer2>,
    nodes: Vec<RoutingNode>,
    queue: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
    rng: StdRng,
    /// Latest scheduled arrival per directed link
    last_arrival: HashMap<(NodeId, NodeId), u64>,
    clock: u64,
    events: usize,
    messages_delivered: usize,
    decode_failures: u64,
    rounds: usize,
    started: bool,
}

impl Simulator {
    /// Validate the config and create every router
    ///
    /// Each router broadcasts its initial vector during construction; those
    /// frames wait in the outbox until a run starts.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let params = config.params();
        let layer2 = Arc::new(Layer2::new(params, &config.costs));

        let nodes = config
            .costs
            .iter()
            .enumerate()
            .map(|(id, costs)| {
                let port: Arc<dyn SchedulerPort> = layer2.clone();
                RoutingNode::new(id, costs, port)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Simulator ready: {} routers, poison reverse {}",
            params.num_nodes,
            if params.poison_reverse { "on" } else { "off" }
        );

        Ok(Self {
            topology: config
                .costs
                .iter()
                .map(|row| row.iter().map(|&c| c.min(config.infinity)).collect())
                .collect(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            layer2,
            nodes,
            queue: BinaryHeap::new(),
            seq: 0,
            last_arrival: HashMap::new(),
            clock: 0,
            events: 0,
            messages_delivered: 0,
            decode_failures: 0,
            rounds: 0,
            started: false,
        })
    }

    /// Run in the mode the config asks for
    pub fn run_configured(&mut self) -> SimReport {
        match self.config.mode {
            RunMode::Async => self.run(),
            RunMode::Rounds => self.run_rounds(),
        }
    }

    /// Asynchronous run: random delays, link changes at their scheduled times
    pub fn run(&mut self) -> SimReport {
        self.start();

        let mut converged = true;
        while !self.queue.is_empty() {
            if self.events >= self.config.max_events {
                warn!(
                    "Event budget of {} spent at time {}; network has not converged",
                    self.config.max_events, self.clock
                );
                converged = false;
                break;
            }
            self.step();
        }

        if converged {
            info!("Converged at time {} after {} events", self.clock, self.events);
        }
        self.report(RunMode::Async, converged)
    }

    /// Process the next async event; `false` once nothing is left in flight
    pub fn step(&mut self) -> bool {
        self.start();

        let Some(Reverse(scheduled)) = self.queue.pop() else {
            return false;
        };

        self.advance_clock(scheduled.time);
        match scheduled.event {
            Event::Deliver(frame) => self.deliver(frame),
            Event::LinkChange(change) => self.apply_link_change(change),
        }
        self.events += 1;
        self.flush_outbox();
        true
    }

    /// Lock-step run: settle, then apply each link change (in time order) and settle again
    pub fn run_rounds(&mut self) -> SimReport {
        // Link changes are applied between settles, never through the event queue
        self.started = true;

        let mut changes = self.config.link_changes.clone();
        changes.sort_by_key(|change| change.time);

        let mut converged = self.settle_rounds();
        for change in changes {
            if !converged {
                break;
            }
            self.apply_link_change(change);
            self.events += 1;
            converged = self.settle_rounds();
        }

        self.report(RunMode::Rounds, converged)
    }

    /// Check every router's costs against all-pairs shortest paths on the current topology
    pub fn verify(&self) -> Vec<Mismatch> {
        let expected = all_pairs_shortest_paths(&self.topology, self.config.infinity);
        let mut mismatches = Vec::new();

        for node in &self.nodes {
            for (dest, &cost) in expected[node.id()].iter().enumerate() {
                let actual = node.cost_to(dest);
                if actual != cost {
                    mismatches.push(Mismatch {
                        node: node.id(),
                        dest,
                        expected: cost,
                        actual,
                    });
                }
            }
        }

        mismatches
    }

    pub fn snapshots(&self) -> Vec<RoutingSnapshot> {
        self.nodes.iter().map(RoutingNode::snapshot).collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&RoutingNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[RoutingNode] {
        &self.nodes
    }

    pub fn topology(&self) -> &[Vec<u32>] {
        &self.topology
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    fn report(&self, mode: RunMode, converged: bool) -> SimReport {
        SimReport {
            mode,
            converged,
            events: self.events,
            messages_delivered: self.messages_delivered,
            frames_dropped: self.layer2.dropped() + self.decode_failures,
            rounds: self.rounds,
            final_clock: self.clock,
        }
    }

    /// Deliver whatever is in the outbox, one round at a time, until it stays empty
    fn settle_rounds(&mut self) -> bool {
        loop {
            let frames = self.layer2.drain();
            if frames.is_empty() {
                return true;
            }
            if self.events + frames.len() > self.config.max_events {
                warn!(
                    "Event budget of {} spent after {} rounds; network has not converged",
                    self.config.max_events, self.rounds
                );
                return false;
            }

            self.rounds += 1;
            self.advance_clock(self.clock + 1);
            debug!("Round {}: delivering {} frames", self.rounds, frames.len());
            for frame in frames {
                self.deliver(frame);
                self.events += 1;
            }
        }
    }

    /// Schedule link changes and the initial broadcasts, once
    fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        for change in self.config.link_changes.clone() {
            self.schedule(change.time, Event::LinkChange(change));
        }
        self.flush_outbox();
    }

    fn advance_clock(&mut self, now: u64) {
        self.clock = self.clock.max(now);
        self.layer2.set_clock(self.clock);
    }

    fn schedule(&mut self, time: u64, event: Event) {
        self.seq += 1;
        self.queue.push(Reverse(Scheduled {
            time,
            seq: self.seq,
            event,
        }));
    }

    /// Give each outgoing frame an arrival time, keeping per-link order
    fn flush_outbox(&mut self) {
        let frames = self.layer2.drain();
        for frame in frames {
            let delay = self.rng.gen_range(1..=self.config.max_delay);
            let last = self
                .last_arrival
                .entry((frame.from, frame.to))
                .or_insert(0);
            let arrival = (self.clock + delay).max(*last);
            *last = arrival;
            self.schedule(arrival, Event::Deliver(frame));
        }
    }

    fn deliver(&mut self, frame: Frame) {
        let message = match decode_update(&frame.bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping frame {} -> {}: {}", frame.from, frame.to, e);
                self.decode_failures += 1;
                return;
            }
        };

        let Some(node) = self.nodes.get_mut(frame.to) else {
            warn!("Dropping frame for unknown router {}", frame.to);
            self.decode_failures += 1;
            return;
        };

        self.messages_delivered += 1;
        node.recv_update(message);
    }

    fn apply_link_change(&mut self, change: LinkChange) {
        let cost = change.cost.min(self.config.infinity);
        info!(
            "t={} link {}-{} cost {} -> {}",
            self.clock, change.a, change.b, self.topology[change.a][change.b], cost
        );

        self.topology[change.a][change.b] = cost;
        self.topology[change.b][change.a] = cost;
        self.nodes[change.a].update_link_cost(change.b, cost);
        self.nodes[change.b].update_link_cost(change.a, cost);
    }
}

impl fmt::Debug for Simulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulator")
            .field("clock", &self.clock)
            .field("events", &self.events)
            .field("in_flight", &self.queue.len())
            .field("nodes", &self.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: u32 = 999;

    #[test]
    fn test_single_router() {
        let mut sim = Simulator::new(SimConfig::new(vec![vec![0]])).unwrap();
        let report = sim.run();
        assert!(report.converged);
        assert_eq!(report.messages_delivered, 0);
        assert_eq!(sim.node(0).unwrap().cost_to(0), 0);
    }

    #[test]
    fn test_two_routers() {
        let mut sim = Simulator::new(SimConfig::new(vec![vec![0, 7], vec![7, 0]])).unwrap();
        let report = sim.run();
        assert!(report.converged);
        assert_eq!(report.messages_delivered, 2);
        assert!(sim.verify().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Simulator::new(SimConfig::new(vec![vec![0, 1], vec![2, 0]]));
        assert!(result.is_err());
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = Simulator::new(SimConfig::sample()).unwrap();
        let mut b = Simulator::new(SimConfig::sample()).unwrap();
        assert_eq!(a.run(), b.run());
        assert_eq!(a.snapshots(), b.snapshots());
    }

    #[test]
    fn test_link_change_updates_topology() {
        let mut sim = Simulator::new(SimConfig::sample()).unwrap();
        sim.run();
        assert_eq!(sim.topology()[0][1], 60);
        assert_eq!(sim.topology()[1][0], 60);
        assert_eq!(sim.node(0).unwrap().link_cost(1), Some(60));
        assert_eq!(sim.node(1).unwrap().link_cost(0), Some(60));
    }

    #[test]
    fn test_event_budget_stops_run() {
        let mut config = SimConfig::new(vec![vec![0, 1, INF], vec![1, 0, 1], vec![INF, 1, 0]]);
        config.max_events = 3;
        let mut sim = Simulator::new(config).unwrap();
        let report = sim.run();
        assert!(!report.converged);
        assert_eq!(report.events, 3);
    }

    #[test]
    fn test_clock_visible_in_snapshots() {
        let mut sim = Simulator::new(SimConfig::sample()).unwrap();
        let report = sim.run();
        assert!(report.final_clock >= 40);
        for snapshot in sim.snapshots() {
            assert_eq!(snapshot.clock, report.final_clock);
        }
    }

    #[test]
    fn test_scheduled_ordering() {
        let early = Scheduled {
            time: 1,
            seq: 9,
            event: Event::LinkChange(LinkChange {
                time: 1,
                a: 0,
                b: 1,
                cost: 1,
            }),
        };
        let late = Scheduled {
            time: 2,
            seq: 1,
            event: Event::LinkChange(LinkChange {
                time: 2,
                a: 0,
                b: 1,
                cost: 1,
            }),
        };
        assert!(early < late);
    }
}
