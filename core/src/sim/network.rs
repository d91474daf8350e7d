// Layer 2: the scheduler side of the SchedulerPort
//
// Nodes hand updates to `send`; they are encoded into frames and parked in
// an outbox until the simulator decides when each one arrives. Frames are
// only accepted on links that exist in the initial topology.

use crate::routing::{encode_update, NodeId, SchedulerPort, SimParams, UpdateMessage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// An encoded update in transit between two neighbors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub from: NodeId,
    pub to: NodeId,
    pub bytes: Vec<u8>,
}

pub struct Layer2 {
    params: SimParams,
    /// adjacency[a][b]: a link exists between a and b
    adjacency: Vec<Vec<bool>>,
    clock: AtomicU64,
    outbox: Mutex<Vec<Frame>>,
    dropped: AtomicU64,
}

impl Layer2 {
    pub fn new(params: SimParams, costs: &[Vec<u32>]) -> Self {
        let adjacency = costs
            .iter()
            .enumerate()
            .map(|(a, row)| {
                row.iter()
                    .enumerate()
                    .map(|(b, &cost)| a != b && cost < params.infinity)
                    .collect()
            })
            .collect();

        Self {
            params,
            adjacency,
            clock: AtomicU64::new(0),
            outbox: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn set_clock(&self, now: u64) {
        self.clock.store(now, Ordering::Relaxed);
    }

    /// Take every frame sent since the last drain, in send order
    pub fn drain(&self) -> Vec<Frame> {
        std::mem::take(&mut *self.outbox.lock())
    }

    pub fn pending(&self) -> usize {
        self.outbox.lock().len()
    }

    /// Frames refused by `send` (no such link, or unencodable)
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_link(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(false)
    }
}

impl SchedulerPort for Layer2 {
    fn params(&self) -> SimParams {
        self.params
    }

    fn clock(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    fn send(&self, to: NodeId, message: UpdateMessage) {
        let from = message.source;
        if !self.is_link(from, to) {
            warn!("Dropping update {} -> {}: no such link", from, to);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match encode_update(&message) {
            Ok(bytes) => self.outbox.lock().push(Frame { from, to, bytes }),
            Err(e) => {
                warn!("Dropping update {} -> {}: {}", from, to, e);
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
