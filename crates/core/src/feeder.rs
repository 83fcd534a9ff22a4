//! Deterministic nibble source feeding the flash model's data phase.
//!
//! The flash model only needs a "produce next nibble" capability; anything
//! deterministic satisfying [`NibbleSource`] can stand in for the reference
//! buffer (file-backed content, generated test patterns, ...).

/// Which half of each source byte is emitted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NibbleOrder {
    /// High nibble, then low nibble (the common quad-read ordering).
    #[default]
    HighFirst,
    LowFirst,
}

/// Capability to produce a deterministic nibble stream.
///
/// `next_nibble` returns `None` once the stream is exhausted; the bench
/// converts early exhaustion into an underrun failure and continued
/// production past the expected count into an overrun failure.
pub trait NibbleSource {
    fn next_nibble(&mut self) -> Option<u8>;

    /// Total number of nibbles this source will deliver.
    fn total_nibbles(&self) -> usize;
}

/// Nibble source backed by a reference byte buffer: 2 nibbles per byte.
///
/// Restartable via [`rewind`](BufferFeeder::rewind) for a fresh run; not
/// meant to be shared across concurrent runs.
pub struct BufferFeeder {
    data: Vec<u8>,
    cursor: usize,
    order: NibbleOrder,
}

impl BufferFeeder {
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_order(data, NibbleOrder::HighFirst)
    }

    pub fn with_order(data: Vec<u8>, order: NibbleOrder) -> Self {
        BufferFeeder { data, cursor: 0, order }
    }

    /// Reset the cursor for a new run.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Nibbles delivered so far.
    pub fn delivered(&self) -> usize {
        self.cursor
    }
}

impl NibbleSource for BufferFeeder {
    fn next_nibble(&mut self) -> Option<u8> {
        if self.cursor >= self.data.len() * 2 {
            return None;
        }
        let byte = self.data[self.cursor / 2];
        let first_half = self.cursor % 2 == 0;
        let nibble = match (self.order, first_half) {
            (NibbleOrder::HighFirst, true) | (NibbleOrder::LowFirst, false) => byte >> 4,
            (NibbleOrder::HighFirst, false) | (NibbleOrder::LowFirst, true) => byte & 0x0F,
        };
        self.cursor += 1;
        Some(nibble)
    }

    fn total_nibbles(&self) -> usize {
        self.data.len() * 2
    }
}
