//! Failure taxonomy for a bench run.
//!
//! This is a correctness-verification tool: there is no retry or recovery.
//! The first violation aborts the run, carrying enough structured context
//! (phase, index, expected/observed values) for a surrounding harness to
//! machine-check the outcome.

use std::fmt;

use thiserror::Error;

/// Protocol phase in which an observation was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the DUT to assert its select line.
    SelectWait,
    /// 8-bit instruction shift-out.
    Instruction,
    /// 32-cycle dummy/hold window.
    Dummy,
    /// Output-enable drop at the dummy/data boundary.
    EnableDrop,
    /// Handshake-paced nibble streaming.
    DataStream,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::SelectWait => "select wait",
            Phase::Instruction => "instruction shift",
            Phase::Dummy => "dummy window",
            Phase::EnableDrop => "enable drop",
            Phase::DataStream => "data stream",
        };
        f.write_str(name)
    }
}

/// Fatal bench failures. Any of these terminates the run immediately.
#[derive(Debug, Error)]
pub enum BenchError {
    /// An observed line state mismatched the expected protocol value.
    #[error("protocol violation during {phase} at index {index}: expected {expected}, observed {observed}")]
    Protocol {
        phase: Phase,
        index: u32,
        expected: u8,
        observed: u8,
    },

    /// A handshake failed to appear within the configured cycle budget.
    #[error("timeout during {phase}: no handshake within {bound} cycles (nibble {nibble})")]
    Timeout {
        phase: Phase,
        nibble: usize,
        bound: u32,
    },

    /// The nibble source ran dry before the transfer was complete.
    #[error("data source underrun: expected {expected} nibbles, source provided {provided}")]
    SourceUnderrun { expected: usize, provided: usize },

    /// The nibble source kept producing past the expected transfer length.
    #[error("data source overrun: source still producing after the expected {expected} nibbles")]
    SourceOverrun { expected: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unreadable run-report file.
    #[error("bad report file: {0}")]
    Report(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_message_names_all_context() {
        let err = BenchError::Protocol {
            phase: Phase::Instruction,
            index: 3,
            expected: 1,
            observed: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("instruction shift"));
        assert!(msg.contains("index 3"));
        assert!(msg.contains("expected 1"));
        assert!(msg.contains("observed 0"));
    }

    #[test]
    fn timeout_message_names_nibble_and_bound() {
        let err = BenchError::Timeout { phase: Phase::DataStream, nibble: 7, bound: 50_000 };
        let msg = err.to_string();
        assert!(msg.contains("nibble 7"));
        assert!(msg.contains("50000"));
    }
}
