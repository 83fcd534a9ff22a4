//! Reference DUT model.
//!
//! A synchronous software model of a compliant pixel-streaming design:
//! it asserts select, shifts the quad-read opcode out, holds the bus through
//! the dummy window, latches handshake-paced nibbles into a scan-out FIFO
//! and free-runs an 800×525 raster on the color bus. State changes on rising
//! edges only.
//!
//! Fault-injection knobs let tests drive every failure path in the bench:
//! a corrupted opcode bit, a dropped hold cycle, a missing enable drop, and
//! a mute handshake.

use std::collections::VecDeque;

use crate::config::{HoldLine, ProtocolVariant};
use crate::dut::{Dut, DutOutputs, PortPins};
use crate::feeder::NibbleOrder;
use crate::raster::encode_bus;
use crate::{DUMMY_CYCLES, READ_OPCODE, TOTAL_HEIGHT, TOTAL_WIDTH, VISIBLE_HEIGHT, VISIBLE_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DutPhase {
    /// Cycles left before select asserts.
    Idle { wait: u8 },
    /// `bit` is the next opcode bit to place on the line.
    Instruction { bit: u8 },
    Dummy { cycle: u8 },
    /// Extra cycle before the enable drop (bit-7 variant).
    DropDelay,
    Stream,
}

pub struct ReferenceDut {
    variant: ProtocolVariant,
    phase: DutPhase,
    inputs: PortPins,
    in_reset: bool,

    /// Cycles between reset release and select assertion.
    pub select_delay: u8,
    /// Assert the handshake every `pace` cycles (1 = every cycle).
    pub pace: u32,
    /// Byte assembly order; must match the bench's feeder order.
    pub nibble_order: NibbleOrder,

    // Output register state.
    cs_low: bool,
    mosi: bool,
    hold_out: bool,
    hold_oe: bool,
    sclk_en: bool,
    uo_out: u8,

    // Handshake and byte assembly.
    latch_armed: bool,
    pace_count: u32,
    high_nibble: Option<u8>,
    /// Bytes assembled from latched nibbles, exposed for verification.
    pub received: Vec<u8>,
    fifo: VecDeque<u8>,

    // Scan-out raster.
    column: u16,
    row: u16,

    // Fault injection.
    pub corrupt_instruction_bit: Option<u8>,
    pub drop_hold_at: Option<u8>,
    pub suppress_enable_drop: bool,
    pub mute_sclk: bool,
}

impl ReferenceDut {
    pub fn new(variant: ProtocolVariant) -> Self {
        ReferenceDut {
            variant,
            phase: DutPhase::Idle { wait: 3 },
            inputs: PortPins::default(),
            in_reset: true,
            select_delay: 3,
            pace: 1,
            nibble_order: NibbleOrder::HighFirst,
            cs_low: false,
            mosi: false,
            hold_out: false,
            hold_oe: false,
            sclk_en: false,
            uo_out: 0,
            latch_armed: false,
            pace_count: 0,
            high_nibble: None,
            received: Vec::new(),
            fifo: VecDeque::new(),
            column: 1,
            row: 1,
            corrupt_instruction_bit: None,
            drop_hold_at: None,
            suppress_enable_drop: false,
            mute_sclk: false,
        }
    }

    fn instruction_bit(&self, index: u8) -> bool {
        let bit = (READ_OPCODE >> (7 - index)) & 1 != 0;
        if self.corrupt_instruction_bit == Some(index) {
            !bit
        } else {
            bit
        }
    }

    fn enter_stream(&mut self) {
        self.hold_out = false;
        self.hold_oe = false;
        self.sclk_en = false;
        // The bench pre-loads the first nibble at the boundary edge.
        self.latch_armed = true;
        self.pace_count = 0;
        self.phase = DutPhase::Stream;
    }

    fn push_nibble(&mut self, nibble: u8) {
        match self.high_nibble.take() {
            None => self.high_nibble = Some(nibble),
            Some(first) => {
                let byte = match self.nibble_order {
                    NibbleOrder::HighFirst => (first << 4) | nibble,
                    NibbleOrder::LowFirst => (nibble << 4) | first,
                };
                self.received.push(byte);
                self.fifo.push_back(byte);
            }
        }
    }

    /// Advance the scan-out raster one cycle, popping a pixel inside the
    /// active region.
    fn scan_out(&mut self) {
        self.uo_out = if self.column <= VISIBLE_WIDTH as u16 && self.row <= VISIBLE_HEIGHT as u16 {
            self.fifo.pop_front().map(encode_bus).unwrap_or(0)
        } else {
            0
        };
        self.column += 1;
        if self.column > TOTAL_WIDTH {
            self.column = 1;
            self.row += 1;
            if self.row > TOTAL_HEIGHT {
                self.row = 1;
            }
        }
    }
}

impl Dut for ReferenceDut {
    fn set_reset(&mut self, active: bool) {
        self.in_reset = active;
        if active {
            self.phase = DutPhase::Idle { wait: self.select_delay };
            self.cs_low = false;
            self.mosi = false;
            self.hold_out = false;
            self.hold_oe = false;
            self.sclk_en = false;
            self.uo_out = 0;
            self.latch_armed = false;
            self.pace_count = 0;
            self.high_nibble = None;
            self.received.clear();
            self.fifo.clear();
            self.column = 1;
            self.row = 1;
        }
    }

    fn set_inputs(&mut self, pins: PortPins) {
        self.inputs = pins;
    }

    fn rising_edge(&mut self) {
        if self.in_reset {
            return;
        }

        // Latch a nibble provided in response to the previous handshake.
        if self.latch_armed {
            let nibble = self.variant.read_nibble(self.inputs);
            self.push_nibble(nibble);
            self.latch_armed = false;
        }

        match self.phase {
            DutPhase::Idle { wait } => {
                if wait == 0 {
                    self.cs_low = true;
                    self.mosi = self.instruction_bit(0);
                    self.phase = DutPhase::Instruction { bit: 1 };
                } else {
                    self.phase = DutPhase::Idle { wait: wait - 1 };
                }
            }
            DutPhase::Instruction { bit } => {
                if bit < 8 {
                    self.mosi = self.instruction_bit(bit);
                    self.phase = DutPhase::Instruction { bit: bit + 1 };
                } else {
                    self.mosi = false;
                    self.hold_out = self.drop_hold_at != Some(0);
                    self.hold_oe = true;
                    self.phase = DutPhase::Dummy { cycle: 0 };
                }
            }
            DutPhase::Dummy { cycle } => {
                let next = cycle + 1;
                if self.drop_hold_at == Some(next) {
                    self.hold_out = false;
                }
                if next < DUMMY_CYCLES {
                    self.phase = DutPhase::Dummy { cycle: next };
                } else if self.suppress_enable_drop {
                    // Never releases the bus; the bench flags this.
                    self.phase = DutPhase::Dummy { cycle };
                } else {
                    match self.variant.hold {
                        HoldLine::Bit6Falling => self.enter_stream(),
                        HoldLine::Bit7NextRising => self.phase = DutPhase::DropDelay,
                    }
                }
            }
            DutPhase::DropDelay => self.enter_stream(),
            DutPhase::Stream => {
                if !self.mute_sclk {
                    self.pace_count += 1;
                    if self.pace_count >= self.pace {
                        self.pace_count = 0;
                        self.sclk_en = true;
                        self.latch_armed = true;
                    } else {
                        self.sclk_en = false;
                    }
                }
            }
        }

        self.scan_out();
    }

    fn falling_edge(&mut self) {
        // Fully synchronous design; outputs change on rising edges only.
    }

    fn outputs(&self) -> DutOutputs {
        let v = &self.variant;
        let mut uio_out = 0u8;
        if !self.cs_low {
            uio_out |= 1 << v.select_bit;
        }
        if self.mosi {
            uio_out |= 1 << v.mosi_bit;
        }
        if self.sclk_en {
            uio_out |= 1 << v.sclk_en_bit;
        }
        if self.hold_out {
            uio_out |= 1 << v.hold.bit();
        }

        let mut uio_oe = (1 << v.select_bit) | (1 << v.mosi_bit) | (1 << v.sclk_en_bit);
        if self.hold_oe {
            uio_oe |= 1 << v.hold.bit();
        }

        DutOutputs { uo_out: self.uo_out, uio_out, uio_oe }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock the model through reset release and `n` rising edges.
    fn run_cycles(dut: &mut ReferenceDut, n: u32) {
        dut.set_reset(true);
        dut.set_reset(false);
        for _ in 0..n {
            dut.rising_edge();
            dut.falling_edge();
        }
    }

    #[test]
    fn asserts_select_after_the_configured_delay() {
        let mut dut = ReferenceDut::new(ProtocolVariant::default());
        dut.select_delay = 3;
        run_cycles(&mut dut, 3);
        assert_eq!(dut.outputs().uio_bit(2), 1, "still idle");
        dut.rising_edge();
        assert_eq!(dut.outputs().uio_bit(2), 0, "select asserted");
        // First opcode bit (0x6B bit 7 = 0) already on the line.
        assert_eq!(dut.outputs().uio_bit(3), 0);
    }

    #[test]
    fn shifts_the_opcode_msb_first() {
        let mut dut = ReferenceDut::new(ProtocolVariant::default());
        run_cycles(&mut dut, 4); // select asserted, bit 0 driven
        let mut opcode = 0u8;
        for i in 0..8 {
            opcode = (opcode << 1) | dut.outputs().uio_bit(3);
            if i < 7 {
                dut.rising_edge();
            }
        }
        assert_eq!(opcode, 0x6B);
    }

    #[test]
    fn holds_the_bus_through_the_dummy_window() {
        let mut dut = ReferenceDut::new(ProtocolVariant::default());
        run_cycles(&mut dut, 4 + 8); // select + 8 instruction bits gone by
        for cycle in 0..32 {
            let outs = dut.outputs();
            assert_eq!(outs.oe_bit(6), 1, "cycle {cycle}");
            assert_eq!(outs.uio_bit(6), 1, "cycle {cycle}");
            dut.rising_edge();
        }
        // Enable dropped at the boundary.
        assert_eq!(dut.outputs().oe_bit(6), 0);
    }

    #[test]
    fn raster_free_runs_from_reset() {
        let mut dut = ReferenceDut::new(ProtocolVariant::default());
        run_cycles(&mut dut, 800);
        assert_eq!((dut.column, dut.row), (1, 2));
    }
}
