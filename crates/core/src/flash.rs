//! Quad-read flash device model.
//!
//! Pure stimulus generator: it mirrors the protocol the DUT is expected to
//! drive (select, instruction shift, dummy window) and answers the data
//! phase with nibbles from an injected [`NibbleSource`]. It never raises
//! protocol failures itself; compliance checking lives in
//! [`crate::protocol::ProtocolMonitor`].

use crate::config::ProtocolVariant;
use crate::dut::PortPins;
use crate::error::BenchError;
use crate::feeder::NibbleSource;
use crate::{DUMMY_CYCLES, READ_OPCODE};

/// Flash device phase. Transitions are strictly monotonic within a phase;
/// `DataStream` is terminal and persists until the consumer stops pulsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashState {
    /// Waiting for the DUT to pull the select line low.
    AwaitSelect,
    /// Shifting the quad-read opcode, one bit per falling edge.
    Instruction { bit: u8 },
    /// Dummy/hold window before the device drives data.
    Dummy { cycle: u8 },
    /// Streaming nibbles on demand.
    DataStream { nibble: usize },
}

/// Behavioral model of the quad-SPI flash the DUT expects to talk to.
pub struct QspiFlash {
    state: FlashState,
    source: Box<dyn NibbleSource>,
    driven: usize,
}

impl QspiFlash {
    pub fn new(source: Box<dyn NibbleSource>) -> Self {
        QspiFlash { state: FlashState::AwaitSelect, source, driven: 0 }
    }

    pub fn state(&self) -> FlashState {
        self.state
    }

    /// Nibbles the source will deliver over the full transfer.
    pub fn total_nibbles(&self) -> usize {
        self.source.total_nibbles()
    }

    /// Nibbles driven onto the bus so far.
    pub fn nibbles_driven(&self) -> usize {
        self.driven
    }

    /// The DUT asserted select: begin the instruction phase.
    pub fn select_observed(&mut self) {
        debug_assert_eq!(self.state, FlashState::AwaitSelect);
        self.state = FlashState::Instruction { bit: 0 };
        tracing::debug!("flash: select observed, entering instruction phase");
    }

    /// Opcode bit the DUT must be driving at the current instruction index
    /// (bit 7 first).
    pub fn expected_instruction_bit(&self) -> u8 {
        match self.state {
            FlashState::Instruction { bit } => (READ_OPCODE >> (7 - bit)) & 1,
            _ => 0,
        }
    }

    /// One instruction bit went by on a falling edge.
    pub fn instruction_bit_shifted(&mut self) {
        if let FlashState::Instruction { bit } = self.state {
            self.state = if bit < 7 {
                FlashState::Instruction { bit: bit + 1 }
            } else {
                tracing::debug!("flash: instruction complete, entering dummy window");
                FlashState::Dummy { cycle: 0 }
            };
        }
    }

    /// One dummy cycle elapsed.
    pub fn dummy_cycle_elapsed(&mut self) {
        if let FlashState::Dummy { cycle } = self.state {
            self.state = if cycle + 1 < DUMMY_CYCLES {
                FlashState::Dummy { cycle: cycle + 1 }
            } else {
                tracing::debug!("flash: dummy window closed, entering data stream");
                FlashState::DataStream { nibble: 0 }
            };
        }
    }

    /// Drive the next nibble onto the four mapped IO lines.
    ///
    /// Returns the nibble driven; an exhausted source is an underrun.
    pub fn drive_nibble(
        &mut self,
        variant: &ProtocolVariant,
        pins: &mut PortPins,
    ) -> Result<u8, BenchError> {
        let nibble = self.source.next_nibble().ok_or(BenchError::SourceUnderrun {
            expected: self.source.total_nibbles(),
            provided: self.driven,
        })?;
        variant.drive_nibble(pins, nibble);
        self.driven += 1;
        if let FlashState::DataStream { .. } = self.state {
            self.state = FlashState::DataStream { nibble: self.driven };
        }
        Ok(nibble)
    }

    /// Verify the source stops where the protocol stops.
    pub fn finish(&mut self) -> Result<(), BenchError> {
        if self.source.next_nibble().is_some() {
            return Err(BenchError::SourceOverrun { expected: self.source.total_nibbles() });
        }
        Ok(())
    }
}
