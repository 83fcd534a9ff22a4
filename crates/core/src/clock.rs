//! Free-running clock edge driver.
//!
//! The whole bench advances in lockstep with this clock: every wait call is a
//! suspension point, and all logic between two waits runs to completion
//! before the next edge fires. Waiting for a falling edge while the clock is
//! low passes through the intervening rising edge, exactly as a free-running
//! clock would.

use crate::dut::Dut;

/// Periodic clock with explicit rising/falling edge waits.
pub struct EdgeClock {
    level: bool,
    period_ns: u64,
    now_ns: u64,
    rising_edges: u64,
}

impl EdgeClock {
    /// Create a clock with the given full period. Starts low at t = 0.
    pub fn new(period_ns: u64) -> Self {
        EdgeClock { level: false, period_ns, now_ns: 0, rising_edges: 0 }
    }

    /// Advance one half period, delivering the edge to the DUT.
    fn half_step(&mut self, dut: &mut dyn Dut) {
        self.level = !self.level;
        self.now_ns += self.period_ns / 2;
        if self.level {
            self.rising_edges += 1;
            dut.rising_edge();
        } else {
            dut.falling_edge();
        }
    }

    /// Suspend until the next rising transition.
    pub fn wait_rising(&mut self, dut: &mut dyn Dut) {
        loop {
            self.half_step(dut);
            if self.level {
                break;
            }
        }
    }

    /// Suspend until the next falling transition.
    pub fn wait_falling(&mut self, dut: &mut dyn Dut) {
        loop {
            self.half_step(dut);
            if !self.level {
                break;
            }
        }
    }

    /// Let `n` full clock cycles elapse (counted on rising edges).
    pub fn wait_cycles(&mut self, dut: &mut dyn Dut, n: u32) {
        for _ in 0..n {
            self.wait_rising(dut);
        }
    }

    /// Total rising edges delivered since construction.
    pub fn rising_edges(&self) -> u64 {
        self.rising_edges
    }

    /// Simulated time in nanoseconds.
    pub fn now_ns(&self) -> u64 {
        self.now_ns
    }

    /// Current clock level.
    pub fn is_high(&self) -> bool {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dut::{DutOutputs, PortPins};

    /// Probe DUT that records the order of delivered edges.
    #[derive(Default)]
    struct EdgeProbe {
        edges: Vec<bool>, // true = rising
    }

    impl Dut for EdgeProbe {
        fn set_reset(&mut self, _active: bool) {}
        fn set_inputs(&mut self, _pins: PortPins) {}
        fn rising_edge(&mut self) {
            self.edges.push(true);
        }
        fn falling_edge(&mut self) {
            self.edges.push(false);
        }
        fn outputs(&self) -> DutOutputs {
            DutOutputs::default()
        }
    }

    #[test]
    fn wait_rising_from_low_is_one_edge() {
        let mut clock = EdgeClock::new(40);
        let mut probe = EdgeProbe::default();
        clock.wait_rising(&mut probe);
        assert_eq!(probe.edges, vec![true]);
        assert!(clock.is_high());
        assert_eq!(clock.rising_edges(), 1);
        assert_eq!(clock.now_ns(), 20);
    }

    #[test]
    fn wait_falling_from_low_passes_the_rising_edge() {
        let mut clock = EdgeClock::new(40);
        let mut probe = EdgeProbe::default();
        clock.wait_falling(&mut probe);
        assert_eq!(probe.edges, vec![true, false]);
        assert!(!clock.is_high());
        assert_eq!(clock.now_ns(), 40);
    }

    #[test]
    fn wait_cycles_counts_rising_edges() {
        let mut clock = EdgeClock::new(40);
        let mut probe = EdgeProbe::default();
        clock.wait_cycles(&mut probe, 10);
        assert_eq!(clock.rising_edges(), 10);
        assert_eq!(probe.edges.iter().filter(|r| **r).count(), 10);
    }
}
