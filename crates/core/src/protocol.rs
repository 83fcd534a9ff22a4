//! Per-cycle protocol compliance checks.
//!
//! The monitor inspects settled DUT outputs against the expected protocol
//! state and fails fast: the first violation terminates the run with the
//! offending phase, index, and expected/observed values.

use crate::config::ProtocolVariant;
use crate::dut::DutOutputs;
use crate::error::{BenchError, Phase};

pub struct ProtocolMonitor {
    variant: ProtocolVariant,
}

impl ProtocolMonitor {
    pub fn new(variant: ProtocolVariant) -> Self {
        ProtocolMonitor { variant }
    }

    /// Select line observed active (low).
    pub fn select_active(&self, outs: &DutOutputs) -> bool {
        outs.uio_bit(self.variant.select_bit) == 0
    }

    /// Serial-clock-enable handshake observed high.
    pub fn sclk_enabled(&self, outs: &DutOutputs) -> bool {
        outs.uio_bit(self.variant.sclk_en_bit) == 1
    }

    /// The instruction line must carry the expected opcode bit.
    pub fn check_instruction_bit(
        &self,
        index: u8,
        expected: u8,
        outs: &DutOutputs,
    ) -> Result<(), BenchError> {
        let observed = outs.uio_bit(self.variant.mosi_bit);
        if observed != expected {
            return Err(BenchError::Protocol {
                phase: Phase::Instruction,
                index: index as u32,
                expected,
                observed,
            });
        }
        Ok(())
    }

    /// During the dummy window the hold line must be driven (OE high) and
    /// held high for every one of the 32 cycles.
    pub fn check_dummy_cycle(&self, cycle: u8, outs: &DutOutputs) -> Result<(), BenchError> {
        let bit = self.variant.hold.bit();
        let driven = outs.oe_bit(bit);
        if driven != 1 {
            return Err(BenchError::Protocol {
                phase: Phase::Dummy,
                index: cycle as u32,
                expected: 1,
                observed: driven,
            });
        }
        let held = outs.uio_bit(bit);
        if held != 1 {
            return Err(BenchError::Protocol {
                phase: Phase::Dummy,
                index: cycle as u32,
                expected: 1,
                observed: held,
            });
        }
        Ok(())
    }

    /// At the dummy/data boundary the DUT must have released the hold line.
    pub fn check_enable_dropped(&self, outs: &DutOutputs) -> Result<(), BenchError> {
        let observed = outs.oe_bit(self.variant.hold.bit());
        if observed != 0 {
            return Err(BenchError::Protocol {
                phase: Phase::EnableDrop,
                index: 0,
                expected: 0,
                observed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ProtocolMonitor {
        ProtocolMonitor::new(ProtocolVariant::hold_bit6())
    }

    fn outs(uio_out: u8, uio_oe: u8) -> DutOutputs {
        DutOutputs { uo_out: 0, uio_out, uio_oe }
    }

    #[test]
    fn select_is_active_low() {
        let m = monitor();
        assert!(m.select_active(&outs(0, 0)));
        assert!(!m.select_active(&outs(1 << 2, 0)));
    }

    #[test]
    fn instruction_bit_mismatch_is_fatal() {
        let m = monitor();
        // MOSI on uio bit 3.
        assert!(m.check_instruction_bit(0, 1, &outs(1 << 3, 0)).is_ok());
        match m.check_instruction_bit(5, 1, &outs(0, 0)) {
            Err(BenchError::Protocol { phase: Phase::Instruction, index: 5, expected: 1, observed: 0 }) => {}
            other => panic!("expected instruction violation, got {other:?}"),
        }
    }

    #[test]
    fn dummy_requires_hold_driven_high() {
        let m = monitor();
        let good = outs(1 << 6, 1 << 6);
        assert!(m.check_dummy_cycle(0, &good).is_ok());

        // OE low: DUT not driving the hold pin.
        match m.check_dummy_cycle(9, &outs(1 << 6, 0)) {
            Err(BenchError::Protocol { phase: Phase::Dummy, index: 9, .. }) => {}
            other => panic!("expected dummy violation, got {other:?}"),
        }
        // Driven but low.
        assert!(m.check_dummy_cycle(9, &outs(0, 1 << 6)).is_err());
    }

    #[test]
    fn enable_drop_checks_the_variant_bit() {
        let bit7 = ProtocolMonitor::new(ProtocolVariant::hold_bit7());
        assert!(bit7.check_enable_dropped(&outs(0, 1 << 6)).is_ok());
        match bit7.check_enable_dropped(&outs(0, 1 << 7)) {
            Err(BenchError::Protocol { phase: Phase::EnableDrop, expected: 0, observed: 1, .. }) => {}
            other => panic!("expected enable-drop violation, got {other:?}"),
        }
    }

    #[test]
    fn sclk_enable_bit() {
        let m = monitor();
        assert!(m.sclk_enabled(&outs(1 << 4, 0)));
        assert!(!m.sclk_enabled(&outs(0, 0)));
    }
}
