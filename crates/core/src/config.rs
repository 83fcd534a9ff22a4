//! Run configuration: protocol pin maps and bench tuning.
//!
//! Two hold-line placements have been observed on otherwise identical
//! designs; both are first-class configurations here rather than one being
//! treated as a bug. Pipeline-latency constants (leading blank, drain) are
//! run configuration, since DUTs with different internal depths need
//! different values.

use crate::dut::{Port, PortPins};
use crate::feeder::NibbleOrder;
use crate::{DEFAULT_CLOCK_PERIOD_NS, DEFAULT_DRAIN_CYCLES, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_LEADING_BLANK};

/// Placement and sampling edge of the hold/output-enable line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldLine {
    /// Hold on uio bit 6 (shared with the IO_3 input pin); the enable drop
    /// is sampled on the falling edge that closes the dummy window.
    Bit6Falling,
    /// Hold on uio bit 7; the drop is sampled one rising edge later.
    Bit7NextRising,
}

impl HoldLine {
    /// Bit position of the hold line in `uio_out`/`uio_oe`.
    pub fn bit(self) -> u8 {
        match self {
            HoldLine::Bit6Falling => 6,
            HoldLine::Bit7NextRising => 7,
        }
    }
}

/// Pin map for one protocol variant. Immutable for a run's duration.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolVariant {
    /// IO_0..IO_3 input line placement (port, bit).
    pub io_map: [(Port, u8); 4],
    /// Select line in `uio_out`, active low.
    pub select_bit: u8,
    /// Single-line instruction output in `uio_out`.
    pub mosi_bit: u8,
    /// Serial-clock-enable handshake in `uio_out`.
    pub sclk_en_bit: u8,
    pub hold: HoldLine,
}

impl ProtocolVariant {
    /// Variant with the hold line on bit 6, drop sampled on the falling edge.
    pub fn hold_bit6() -> Self {
        ProtocolVariant {
            io_map: [(Port::Uio, 3), (Port::Ui, 2), (Port::Ui, 3), (Port::Uio, 6)],
            select_bit: 2,
            mosi_bit: 3,
            sclk_en_bit: 4,
            hold: HoldLine::Bit6Falling,
        }
    }

    /// Variant with the hold line on bit 7, drop sampled one rising edge late.
    pub fn hold_bit7() -> Self {
        ProtocolVariant { hold: HoldLine::Bit7NextRising, ..Self::hold_bit6() }
    }

    /// Place a nibble on the four mapped IO input lines.
    pub fn drive_nibble(&self, pins: &mut PortPins, nibble: u8) {
        for (i, (port, bit)) in self.io_map.iter().enumerate() {
            pins.set_bit(*port, *bit, (nibble >> i) & 1 != 0);
        }
    }

    /// Read a nibble back off the mapped IO input lines.
    pub fn read_nibble(&self, pins: PortPins) -> u8 {
        let mut nibble = 0;
        for (i, (port, bit)) in self.io_map.iter().enumerate() {
            if pins.bit(*port, *bit) {
                nibble |= 1 << i;
            }
        }
        nibble
    }
}

impl Default for ProtocolVariant {
    fn default() -> Self {
        Self::hold_bit6()
    }
}

/// Tunable parameters for one bench run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub variant: ProtocolVariant,
    /// Cycles to skip before the first pixel sample (DUT pipeline depth).
    pub leading_blank_threshold: u32,
    /// Cycles to keep sampling after the last nibble, letting the DUT's
    /// internal buffering empty onto the color bus.
    pub drain_cycles: u32,
    /// Extra cycles clocked after the drain, observation only.
    pub trail_cycles: u32,
    /// Per-transfer cycle budget for each handshake wait.
    pub handshake_timeout: u32,
    pub nibble_order: NibbleOrder,
    pub clock_period_ns: u64,
    /// Capacity of the failure-diagnosis trace ring.
    pub trace_depth: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            variant: ProtocolVariant::default(),
            leading_blank_threshold: DEFAULT_LEADING_BLANK,
            drain_cycles: DEFAULT_DRAIN_CYCLES,
            trail_cycles: 100,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            nibble_order: NibbleOrder::HighFirst,
            clock_period_ns: DEFAULT_CLOCK_PERIOD_NS,
            trace_depth: 128,
        }
    }
}
