//! Recent-observation ring buffer for failure diagnosis.
//!
//! The bench records (edge, phase, outputs) at every checked observation;
//! when a run fails, the most recent entries are dumped at debug level so
//! the cycles leading up to the violation can be inspected without a
//! waveform.

use crate::dut::DutOutputs;
use crate::error::Phase;

#[derive(Debug, Clone, Copy)]
pub struct TraceEntry {
    /// Rising-edge count when the observation was taken.
    pub edge: u64,
    pub phase: Phase,
    pub outputs: DutOutputs,
}

/// Fixed-capacity ring of the most recent observations.
pub struct TraceRing {
    buf: Vec<Option<TraceEntry>>,
    /// Next slot to overwrite.
    write_pos: usize,
    count: usize,
}

impl TraceRing {
    pub fn new(capacity: usize) -> Self {
        let mut buf = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            buf.push(None);
        }
        TraceRing { buf, write_pos: 0, count: 0 }
    }

    pub fn push(&mut self, entry: TraceEntry) {
        if self.buf.is_empty() {
            return;
        }
        self.buf[self.write_pos] = Some(entry);
        self.write_pos = (self.write_pos + 1) % self.buf.len();
        if self.count < self.buf.len() {
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> Vec<TraceEntry> {
        let cap = self.buf.len();
        let mut out = Vec::with_capacity(self.count);
        if cap == 0 {
            return out;
        }
        let start = (self.write_pos + cap - self.count) % cap;
        for i in 0..self.count {
            if let Some(entry) = self.buf[(start + i) % cap] {
                out.push(entry);
            }
        }
        out
    }
}
