//! Raster position tracking and color-bus sampling.
//!
//! The raster counters are explicit state threaded through the sampler, with
//! clear initialization (1, 1) and wrap rules: column 800 → 1 with a row
//! increment, row 525 → 1. Position tracking always advances once sampling
//! has begun; pixel emission is gated by the active-region test, so
//! alignment is preserved across blanking intervals.

use crate::dut::DutOutputs;
use crate::frame::FrameCapture;
use crate::{TOTAL_HEIGHT, TOTAL_WIDTH, VISIBLE_HEIGHT, VISIBLE_WIDTH};

/// Decode the DUT's color bus into a packed 3-3-2 sample.
///
/// Bus layout: red on bits 2..0, green on bits 5..3, blue on bits 7..6.
/// Packed layout: red in the top 3 bits, green in the middle 3, blue in the
/// bottom 2.
pub fn decode_bus(uo_out: u8) -> u8 {
    let red = uo_out & 0b111;
    let green = (uo_out >> 3) & 0b111;
    let blue = (uo_out >> 6) & 0b11;
    (red << 5) | (green << 2) | blue
}

/// Inverse of [`decode_bus`]; places a packed 3-3-2 sample on the bus layout.
pub fn encode_bus(packed: u8) -> u8 {
    let red = (packed >> 5) & 0b111;
    let green = (packed >> 2) & 0b111;
    let blue = packed & 0b11;
    red | (green << 3) | (blue << 6)
}

/// Raster position inside the 800×525 blanking frame, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterState {
    pub column: u16,
    pub row: u16,
    /// Cycles observed before the sampling threshold was crossed. Frozen
    /// once sampling begins.
    pub leading_blank: u32,
}

impl RasterState {
    pub fn new() -> Self {
        RasterState { column: 1, row: 1, leading_blank: 0 }
    }

    /// Advance one cycle, wrapping both counters.
    pub fn advance(&mut self) {
        self.column += 1;
        if self.column > TOTAL_WIDTH {
            self.column = 1;
            self.row += 1;
            if self.row > TOTAL_HEIGHT {
                self.row = 1;
            }
        }
    }

    /// Inside the visible 640×480 window.
    pub fn in_active_region(&self) -> bool {
        self.column <= VISIBLE_WIDTH as u16 && self.row <= VISIBLE_HEIGHT as u16
    }
}

impl Default for RasterState {
    fn default() -> Self {
        Self::new()
    }
}

/// Samples the DUT color bus once per cycle, gated by raster position and
/// the leading-blank threshold.
pub struct BusSampler {
    raster: RasterState,
    threshold: u32,
}

impl BusSampler {
    pub fn new(threshold: u32) -> Self {
        BusSampler { raster: RasterState::new(), threshold }
    }

    /// Run one sampling step against settled DUT outputs.
    pub fn sample(&mut self, outs: &DutOutputs, frame: &mut FrameCapture) {
        if self.raster.leading_blank < self.threshold {
            self.raster.leading_blank += 1;
            return;
        }
        if self.raster.in_active_region() {
            frame.push(decode_bus(outs.uo_out));
        }
        self.raster.advance();
    }

    pub fn raster(&self) -> &RasterState {
        &self.raster
    }

    /// Whether the leading-blank window has been fully consumed.
    pub fn threshold_crossed(&self) -> bool {
        self.raster.leading_blank >= self.threshold
    }
}
