//! # qspi-bench-core
//!
//! Cycle-stepped verification bench for pixel-streaming designs that fetch
//! their content over a quad-SPI flash interface.
//!
//! The bench plays the part of everything around the design under test: a
//! behavioral quad-read flash model answers the command sequence with
//! nibbles from a reference buffer, a protocol monitor checks every observed
//! edge (opcode 0x6B shifted MSB-first, the 32-cycle dummy/hold window, the
//! enable drop at the bus turnaround, handshake-paced streaming), and a
//! raster-aware sampler reconstructs the 640×480 frame out of the 800×525
//! scan-out timing on the color bus.
//!
//! ## Architecture
//!
//! - [`TestBench`] — top-level harness wiring clock, flash model, monitor,
//!   sampler and frame capture around a [`Dut`]
//! - [`EdgeClock`] — free-running clock with rising/falling edge waits
//! - [`QspiFlash`] — quad-read flash state machine (stimulus only)
//! - [`BufferFeeder`] / [`NibbleSource`] — deterministic nibble stream,
//!   two nibbles per reference byte
//! - [`ProtocolMonitor`] — fail-fast per-edge compliance checks
//! - [`BusSampler`] / [`RasterState`] — blanking-aware pixel capture
//! - [`FrameCapture`] — append-only row-major 3-3-2 frame
//! - [`RunReport`] — machine-readable outcome with an on-disk format
//! - [`ReferenceDut`] — compliant software DUT with fault injection
//!
//! A run either passes (all expected nibbles transferred, every check
//! satisfied) or fails fast with a [`BenchError`] naming the violated
//! check, the cycle or bit index, and expected vs. observed values.

pub mod clock;
pub mod config;
pub mod dut;
pub mod error;
pub mod feeder;
pub mod flash;
pub mod frame;
pub mod protocol;
pub mod raster;
pub mod refdut;
pub mod report;
pub mod trace;

pub use clock::EdgeClock;
pub use config::{BenchConfig, HoldLine, ProtocolVariant};
pub use dut::{Dut, DutOutputs, Port, PortPins};
pub use error::{BenchError, Phase};
pub use feeder::{BufferFeeder, NibbleOrder, NibbleSource};
pub use flash::{FlashState, QspiFlash};
pub use frame::FrameCapture;
pub use protocol::ProtocolMonitor;
pub use raster::{BusSampler, RasterState};
pub use refdut::ReferenceDut;
pub use report::RunReport;

use trace::{TraceEntry, TraceRing};

/// Active video width in pixels.
pub const VISIBLE_WIDTH: usize = 640;
/// Active video height in lines.
pub const VISIBLE_HEIGHT: usize = 480;
/// Total raster width including horizontal blanking.
pub const TOTAL_WIDTH: u16 = 800;
/// Total raster height including vertical blanking.
pub const TOTAL_HEIGHT: u16 = 525;
/// Pixels in one complete captured frame.
pub const FRAME_PIXELS: usize = VISIBLE_WIDTH * VISIBLE_HEIGHT;

/// Quad-output fast read instruction.
pub const READ_OPCODE: u8 = 0x6B;
/// Dummy cycles between the instruction and the first data nibble.
pub const DUMMY_CYCLES: u8 = 32;

/// Default leading-blank skip: pipeline latency of the reference design.
pub const DEFAULT_LEADING_BLANK: u32 = 35_318;
/// Default drain window: seven full scan lines.
pub const DEFAULT_DRAIN_CYCLES: u32 = 800 * 7;
/// Default per-nibble handshake budget in cycles.
pub const DEFAULT_HANDSHAKE_TIMEOUT: u32 = 50_000;
/// Default clock period (25 MHz pixel clock).
pub const DEFAULT_CLOCK_PERIOD_NS: u64 = 40;

/// Top-level verification bench around one DUT.
///
/// Owns every piece of per-run state; nothing is shared across runs. All
/// checks and samples for cycle N complete before any for cycle N+1 — the
/// whole scenario is one sequential loop advanced by [`EdgeClock`] waits.
pub struct TestBench<D: Dut> {
    pub dut: D,
    pub clock: EdgeClock,
    pub config: BenchConfig,
    pub frame: FrameCapture,
    flash: QspiFlash,
    monitor: ProtocolMonitor,
    sampler: BusSampler,
    trace: TraceRing,
}

impl<D: Dut> TestBench<D> {
    /// Bench over a reference byte buffer, streamed in the configured
    /// nibble order.
    pub fn new(dut: D, data: Vec<u8>, config: BenchConfig) -> Self {
        let source = BufferFeeder::with_order(data, config.nibble_order);
        Self::with_source(dut, Box::new(source), config)
    }

    /// Bench over a caller-supplied source. The source defines its own
    /// emission order; `config.nibble_order` is not applied to it.
    pub fn with_source(dut: D, source: Box<dyn NibbleSource>, config: BenchConfig) -> Self {
        TestBench {
            dut,
            clock: EdgeClock::new(config.clock_period_ns),
            frame: FrameCapture::new(),
            flash: QspiFlash::new(source),
            monitor: ProtocolMonitor::new(config.variant),
            sampler: BusSampler::new(config.leading_blank_threshold),
            trace: TraceRing::new(config.trace_depth),
            config,
        }
    }

    /// Run the full scenario: reset, select wait, instruction, dummy window,
    /// nibble stream, drain. Fails fast on the first violation.
    pub fn run(&mut self) -> Result<RunReport, BenchError> {
        match self.execute() {
            Ok(nibbles) => {
                tracing::info!(nibbles, pixels = self.frame.len(), "run passed");
                Ok(self.build_report(true, None, nibbles))
            }
            Err(err) => {
                tracing::warn!("run failed: {err}");
                self.dump_trace();
                Err(err)
            }
        }
    }

    /// Report for a failed run, for harnesses that persist failures too.
    pub fn failure_report(&self, err: &BenchError) -> RunReport {
        self.build_report(false, Some(err.to_string()), self.flash.nibbles_driven())
    }

    fn execute(&mut self) -> Result<usize, BenchError> {
        let variant = self.config.variant;

        // Reset sequence: two cycles in reset, inputs idle.
        self.dut.set_inputs(PortPins::default());
        self.dut.set_reset(true);
        self.clock.wait_cycles(&mut self.dut, 2);
        self.dut.set_reset(false);
        tracing::info!("reset released, awaiting select");

        // Select wait, polled on falling edges. Bounded so a dead DUT cannot
        // hang the run.
        let mut waited = 0u32;
        loop {
            self.clock.wait_falling(&mut self.dut);
            let outs = self.dut.outputs();
            self.record(Phase::SelectWait, outs);
            if self.monitor.select_active(&outs) {
                break;
            }
            waited += 1;
            if waited >= self.config.handshake_timeout {
                return Err(BenchError::Timeout {
                    phase: Phase::SelectWait,
                    nibble: 0,
                    bound: self.config.handshake_timeout,
                });
            }
        }
        self.flash.select_observed();
        tracing::info!("select asserted, checking instruction shift");

        // Instruction: 8 bits sampled on falling edges, the first on the
        // same edge where select was first seen low.
        for index in 0..8u8 {
            let outs = self.dut.outputs();
            self.record(Phase::Instruction, outs);
            let expected = self.flash.expected_instruction_bit();
            self.monitor.check_instruction_bit(index, expected, &outs)?;
            self.flash.instruction_bit_shifted();
            self.clock.wait_falling(&mut self.dut);
        }
        tracing::info!("instruction accepted, checking dummy window");

        // Dummy window: hold line driven high for all 32 cycles.
        for cycle in 0..DUMMY_CYCLES {
            let outs = self.dut.outputs();
            self.record(Phase::Dummy, outs);
            self.monitor.check_dummy_cycle(cycle, &outs)?;
            self.flash.dummy_cycle_elapsed();
            if cycle < DUMMY_CYCLES - 1 {
                self.clock.wait_falling(&mut self.dut);
            }
        }

        // Boundary: the flash starts driving. The first nibble goes onto the
        // bus here; the enable drop is checked on the variant's edge.
        self.clock.wait_falling(&mut self.dut);
        let mut pins = PortPins::default();
        self.flash.drive_nibble(&variant, &mut pins)?;
        self.dut.set_inputs(pins);
        if let HoldLine::Bit7NextRising = variant.hold {
            self.clock.wait_rising(&mut self.dut);
        }
        let outs = self.dut.outputs();
        self.record(Phase::EnableDrop, outs);
        self.monitor.check_enable_dropped(&outs)?;

        let total = self.flash.total_nibbles();
        tracing::info!(total, "bus released, streaming nibbles");

        // Stream: nibble 0 is already on the bus; each further nibble waits
        // for a serial-clock-enable pulse under a fresh timeout budget. The
        // sampler runs on every cycle spent here.
        for nibble_index in 1..total {
            let mut budget = 0u32;
            loop {
                self.clock.wait_rising(&mut self.dut);
                let enabled = self.monitor.sclk_enabled(&self.dut.outputs());
                self.clock.wait_falling(&mut self.dut);
                let outs = self.dut.outputs();
                self.record(Phase::DataStream, outs);
                self.sampler.sample(&outs, &mut self.frame);
                self.dut.set_inputs(PortPins::default());
                if enabled {
                    break;
                }
                budget += 1;
                if budget >= self.config.handshake_timeout {
                    return Err(BenchError::Timeout {
                        phase: Phase::DataStream,
                        nibble: nibble_index,
                        bound: self.config.handshake_timeout,
                    });
                }
            }
            let mut pins = PortPins::default();
            self.flash.drive_nibble(&variant, &mut pins)?;
            self.dut.set_inputs(pins);
        }
        self.flash.finish()?;
        tracing::info!(total, "stream complete, draining pipeline");

        // Drain: the DUT's internal buffering empties onto the color bus,
        // so the sampler keeps running until the configured window closes.
        // The last nibble stays on the bus through the first drain edge; it
        // has not been latched yet.
        for cycle in 0..self.config.drain_cycles {
            self.clock.wait_rising(&mut self.dut);
            if cycle == 0 {
                self.dut.set_inputs(PortPins::default());
            }
            self.clock.wait_falling(&mut self.dut);
            let outs = self.dut.outputs();
            self.sampler.sample(&outs, &mut self.frame);
        }

        // Post-run observation window, clock only.
        self.clock.wait_cycles(&mut self.dut, self.config.trail_cycles);

        Ok(total)
    }

    fn record(&mut self, phase: Phase, outputs: DutOutputs) {
        self.trace.push(TraceEntry { edge: self.clock.rising_edges(), phase, outputs });
    }

    fn dump_trace(&self) {
        for entry in self.trace.entries() {
            tracing::debug!(
                edge = entry.edge,
                phase = %entry.phase,
                uo_out = format_args!("0x{:02X}", entry.outputs.uo_out),
                uio_out = format_args!("0x{:02X}", entry.outputs.uio_out),
                uio_oe = format_args!("0x{:02X}", entry.outputs.uio_oe),
                "trace",
            );
        }
    }

    fn build_report(&self, passed: bool, failure: Option<String>, nibbles: usize) -> RunReport {
        RunReport {
            passed,
            failure,
            nibbles_transferred: nibbles,
            expected_nibbles: self.flash.total_nibbles(),
            rising_edges: self.clock.rising_edges(),
            simulated_ns: self.clock.now_ns(),
            captured_pixels: self.frame.len(),
            frame_complete: self.frame.is_complete(),
            leading_blank_threshold: self.config.leading_blank_threshold,
            drain_cycles: self.config.drain_cycles,
            handshake_timeout: self.config.handshake_timeout,
            hold_line_bit: self.config.variant.hold.bit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_data() -> Vec<u8> {
        vec![0x6B, 0x00, 0xFF, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE]
    }

    fn bench_with(
        dut: ReferenceDut,
        data: Vec<u8>,
        config: BenchConfig,
    ) -> TestBench<ReferenceDut> {
        TestBench::new(dut, data, config)
    }

    #[test]
    fn compliant_dut_passes_and_reconstructs_the_source() {
        let data = reference_data();
        let dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        let mut bench = bench_with(dut, data.clone(), BenchConfig::default());
        let report = bench.run().expect("compliant DUT must pass");

        assert!(report.passed);
        assert_eq!(report.nibbles_transferred, 20);
        assert_eq!(report.expected_nibbles, 20);
        // Every streamed byte arrived intact at the DUT.
        assert_eq!(&bench.dut.received[..data.len()], &data[..]);
        // Short run: the leading-blank window is never crossed, so the drain
        // adds no spurious pixels.
        assert_eq!(report.captured_pixels, 0);
    }

    #[test]
    fn bit7_variant_passes_with_delayed_enable_drop() {
        let data = reference_data();
        let dut = ReferenceDut::new(ProtocolVariant::hold_bit7());
        let config =
            BenchConfig { variant: ProtocolVariant::hold_bit7(), ..BenchConfig::default() };
        let mut bench = bench_with(dut, data.clone(), config);
        let report = bench.run().expect("bit-7 variant must pass");
        assert_eq!(report.hold_line_bit, 7);
        assert_eq!(&bench.dut.received[..data.len()], &data[..]);
    }

    #[test]
    fn low_first_order_flows_from_config_to_the_stream() {
        // Nibble-asymmetric bytes: any order mismatch between the bench's
        // emission and the DUT's assembly swaps the halves.
        let data = vec![0x12, 0x34, 0xA5, 0x0F, 0xE1];
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.nibble_order = NibbleOrder::LowFirst;
        let config =
            BenchConfig { nibble_order: NibbleOrder::LowFirst, ..BenchConfig::default() };
        let mut bench = bench_with(dut, data.clone(), config);
        let report = bench.run().expect("low-first order is still compliant");
        assert_eq!(report.nibbles_transferred, 10);
        assert_eq!(&bench.dut.received[..data.len()], &data[..]);
    }

    #[test]
    fn paced_handshake_still_completes() {
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.pace = 3;
        let mut bench = bench_with(dut, reference_data(), BenchConfig::default());
        let report = bench.run().expect("slow handshake is still compliant");
        assert_eq!(report.nibbles_transferred, 20);
    }

    #[test]
    fn corrupted_instruction_bit_fails_with_its_index() {
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.corrupt_instruction_bit = Some(3);
        let mut bench = bench_with(dut, reference_data(), BenchConfig::default());
        match bench.run() {
            Err(BenchError::Protocol {
                phase: Phase::Instruction,
                index: 3,
                expected: 0,
                observed: 1,
            }) => {}
            other => panic!("expected instruction violation at bit 3, got {other:?}"),
        }
    }

    #[test]
    fn dropped_hold_fails_with_its_cycle() {
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.drop_hold_at = Some(5);
        let mut bench = bench_with(dut, reference_data(), BenchConfig::default());
        match bench.run() {
            Err(BenchError::Protocol { phase: Phase::Dummy, index: 5, expected: 1, observed: 0 }) => {
            }
            other => panic!("expected dummy violation at cycle 5, got {other:?}"),
        }
    }

    #[test]
    fn missing_enable_drop_is_flagged_at_the_boundary() {
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.suppress_enable_drop = true;
        let mut bench = bench_with(dut, reference_data(), BenchConfig::default());
        match bench.run() {
            Err(BenchError::Protocol { phase: Phase::EnableDrop, expected: 0, observed: 1, .. }) => {
            }
            other => panic!("expected enable-drop violation, got {other:?}"),
        }
    }

    #[test]
    fn mute_handshake_times_out_within_the_budget() {
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.mute_sclk = true;
        let config = BenchConfig { handshake_timeout: 100, ..BenchConfig::default() };
        let mut bench = bench_with(dut, reference_data(), config);
        match bench.run() {
            Err(BenchError::Timeout { phase: Phase::DataStream, nibble: 1, bound: 100 }) => {}
            other => panic!("expected stream timeout, got {other:?}"),
        }
        // Bounded: the clock advanced by roughly the budget, not forever.
        assert!(bench.clock.rising_edges() < 1_000);
    }

    #[test]
    fn absent_select_times_out() {
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.select_delay = 255;
        let config = BenchConfig { handshake_timeout: 50, ..BenchConfig::default() };
        let mut bench = bench_with(dut, reference_data(), config);
        match bench.run() {
            Err(BenchError::Timeout { phase: Phase::SelectWait, nibble: 0, bound: 50 }) => {}
            other => panic!("expected select timeout, got {other:?}"),
        }
    }

    #[test]
    fn sampler_captures_during_stream_and_drain_once_threshold_crossed() {
        let dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        let config = BenchConfig { leading_blank_threshold: 0, ..BenchConfig::default() };
        let mut bench = bench_with(dut, reference_data(), config);
        let report = bench.run().expect("compliant DUT must pass");
        // 19 sampled stream cycles + 5600 drain cycles walk the raster
        // through 7 full rows and 19 columns of row 8.
        assert_eq!(report.captured_pixels, 7 * 640 + 19);
        assert_eq!(bench.frame.rows(), 7);
    }

    #[test]
    fn failure_report_carries_the_failure_text() {
        let mut dut = ReferenceDut::new(ProtocolVariant::hold_bit6());
        dut.corrupt_instruction_bit = Some(1);
        let mut bench = bench_with(dut, reference_data(), BenchConfig::default());
        let err = bench.run().expect_err("must fail");
        let report = bench.failure_report(&err);
        assert!(!report.passed);
        let text = report.failure.expect("failure text");
        assert!(text.contains("instruction shift"));
    }
}
