use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ReadyTick {
    due: Instant,
    sequence: u64,
    id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// A slot was free; the caller runs the cycle now.
    Run,
    /// Waiting in the ready queue for a slot.
    Queued,
    /// The unit's previous cycle is still running; the tick is dropped.
    Busy,
    /// The unit already has a tick waiting; this one merges into it.
    Coalesced,
    Rejected { in_flight: usize, queued: usize },
}

/// Slot accounting for the global evaluation cap plus the due-time ordered ready queue.
#[derive(Debug)]
pub(crate) struct DispatchQueue {
    max_in_flight: usize,
    queue_capacity: usize,
    running: HashSet<String>,
    queued: HashSet<String>,
    ready: BinaryHeap<Reverse<ReadyTick>>,
    sequence: u64,
}

impl DispatchQueue {
    pub(crate) fn new(max_in_flight: usize, queue_capacity: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
            queue_capacity,
            running: HashSet::new(),
            queued: HashSet::new(),
            ready: BinaryHeap::new(),
            sequence: 0,
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queued.len()
    }

    pub(crate) fn admit(&mut self, id: &str, due: Instant) -> Admission {
        if self.running.contains(id) {
            return Admission::Busy;
        }
        if self.queued.contains(id) {
            return Admission::Coalesced;
        }
        if self.running.len() < self.max_in_flight {
            self.running.insert(id.to_string());
            return Admission::Run;
        }
        if self.queued.len() >= self.queue_capacity {
            return Admission::Rejected {
                in_flight: self.running.len(),
                queued: self.queued.len(),
            };
        }

        self.sequence += 1;
        self.ready.push(Reverse(ReadyTick {
            due,
            sequence: self.sequence,
            id: id.to_string(),
        }));
        self.queued.insert(id.to_string());
        Admission::Queued
    }

    /// Frees the slot held by `id` and hands it to the earliest waiting tick, if any.
    pub(crate) fn release(&mut self, id: &str) -> Option<String> {
        self.running.remove(id);

        while self.running.len() < self.max_in_flight {
            let Reverse(tick) = self.ready.pop()?;
            if self.queued.remove(&tick.id) {
                self.running.insert(tick.id.clone());
                return Some(tick.id);
            }
        }
        None
    }

    /// Drops any waiting tick for `id`. A running cycle keeps its slot until released.
    pub(crate) fn forget(&mut self, id: &str) {
        if self.queued.remove(id) {
            self.ready.retain(|Reverse(tick)| tick.id != id);
        }
    }
}
