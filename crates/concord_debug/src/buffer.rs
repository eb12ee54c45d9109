//! Bounded storage for trace records.

use std::collections::{HashMap, HashSet, VecDeque};

use concord_foundation::FlowId;

use crate::record::{TraceEvent, TraceRecord};

// =============================================================================
// Trace Buffer
// =============================================================================

/// Keeps the most recent trace records up to a fixed capacity.
///
/// Record ids increase monotonically for the lifetime of the buffer, so a
/// reader can tell how many records were dropped between two snapshots.
#[derive(Clone, Debug)]
pub struct TraceBuffer {
    records: VecDeque<TraceRecord>,
    capacity: usize,
    next_id: u64,
    evicted: u64,
}

impl TraceBuffer {
    /// Creates a buffer holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 0,
            evicted: 0,
        }
    }

    /// Appends an event, evicting the oldest record when full.
    ///
    /// Returns the id assigned to the new record.
    pub fn push(&mut self, timestamp_ns: u64, event: TraceEvent) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push_back(TraceRecord::new(id, timestamp_ns, event));

        while self.records.len() > self.capacity {
            self.records.pop_front();
            self.evicted += 1;
        }
        id
    }

    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every held record. Ids keep counting from where they were.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter()
    }

    /// The last `count` records, oldest first.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &TraceRecord> {
        self.records
            .iter()
            .skip(self.records.len().saturating_sub(count))
    }

    /// Records whose event kind is `kind` (e.g. `"dispatch"`).
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a TraceRecord> + 'a {
        self.records.iter().filter(move |r| r.event_type() == kind)
    }

    /// Records from one flow.
    pub fn for_flow(&self, flow: FlowId) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter().filter(move |r| r.event.flow() == flow)
    }

    /// Defect records: binding defects, refinement failures, and the kill switch.
    pub fn defects(&self) -> impl Iterator<Item = &TraceRecord> {
        self.records.iter().filter(|r| r.event.is_defect())
    }

    /// Summarizes what the buffer holds.
    #[must_use]
    pub fn stats(&self) -> TraceBufferStats {
        let mut event_counts: HashMap<&'static str, usize> = HashMap::new();
        let mut flows: HashSet<FlowId> = HashSet::new();
        for record in &self.records {
            *event_counts.entry(record.event_type()).or_default() += 1;
            flows.insert(record.event.flow());
        }

        TraceBufferStats {
            record_count: self.records.len(),
            capacity: self.capacity,
            evicted: self.evicted,
            flow_count: flows.len(),
            event_counts,
        }
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new(10_000)
    }
}

// =============================================================================
// Buffer Statistics
// =============================================================================

/// A summary of a [`TraceBuffer`].
#[derive(Clone, Debug)]
pub struct TraceBufferStats {
    /// Records currently held.
    pub record_count: usize,
    /// Maximum records held.
    pub capacity: usize,
    /// Records dropped to stay within capacity.
    pub evicted: u64,
    /// Distinct flows among the held records.
    pub flow_count: usize,
    /// Held records per event kind.
    pub event_counts: HashMap<&'static str, usize>,
}
