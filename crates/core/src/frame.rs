//! Captured frame accumulator.
//!
//! Append-only, row-major, one packed 3-3-2 byte per pixel. A fully drained
//! run produces exactly 640×480 entries; a partial run leaves a consistent
//! row-major prefix.

use std::fs;
use std::io;
use std::path::Path;

use crate::{FRAME_PIXELS, VISIBLE_WIDTH};

pub struct FrameCapture {
    pixels: Vec<u8>,
}

impl FrameCapture {
    pub fn new() -> Self {
        FrameCapture { pixels: Vec::with_capacity(FRAME_PIXELS) }
    }

    pub fn push(&mut self, pixel: u8) {
        self.pixels.push(pixel);
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Full 640×480 frame captured.
    pub fn is_complete(&self) -> bool {
        self.pixels.len() == FRAME_PIXELS
    }

    /// Complete rows captured so far.
    pub fn rows(&self) -> usize {
        self.pixels.len() / VISIBLE_WIDTH
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Write the raw frame bytes (row-major, one byte per pixel).
    pub fn write_binary(&self, path: &Path) -> io::Result<()> {
        fs::write(path, &self.pixels)
    }

    /// Expand packed 3-3-2 pixels to 0xRRGGBB u32s for display.
    pub fn as_pixel_buffer(&self) -> Vec<u32> {
        self.pixels
            .iter()
            .map(|&px| {
                let r3 = (px >> 5) & 0b111;
                let g3 = (px >> 2) & 0b111;
                let b2 = px & 0b11;
                // Replicate the high bits down to fill 8-bit channels.
                let r = (r3 << 5) | (r3 << 2) | (r3 >> 1);
                let g = (g3 << 5) | (g3 << 2) | (g3 >> 1);
                let b = b2 * 0x55;
                ((r as u32) << 16) | ((g as u32) << 8) | b as u32
            })
            .collect()
    }
}

impl Default for FrameCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_grows_append_only() {
        let mut frame = FrameCapture::new();
        assert!(frame.is_empty());
        for px in 0..640u32 {
            frame.push(px as u8);
        }
        assert_eq!(frame.len(), 640);
        assert_eq!(frame.rows(), 1);
        assert!(!frame.is_complete());
        assert_eq!(frame.as_bytes()[0], 0);
    }

    #[test]
    fn pixel_buffer_expands_channels() {
        let mut frame = FrameCapture::new();
        frame.push(0xFF); // white
        frame.push(0x00); // black
        frame.push(0b111_000_00); // pure red
        let buf = frame.as_pixel_buffer();
        assert_eq!(buf[0], 0x00FF_FFFF);
        assert_eq!(buf[1], 0x0000_0000);
        assert_eq!(buf[2], 0x00FF_0000);
    }

    #[test]
    fn write_binary_round_trips() {
        let mut frame = FrameCapture::new();
        for px in [0x12u8, 0x34, 0x56] {
            frame.push(px);
        }
        let path = std::env::temp_dir().join("qspi-bench-frame-test.bin");
        frame.write_binary(&path).expect("write frame");
        let read_back = std::fs::read(&path).expect("read frame");
        assert_eq!(read_back, vec![0x12, 0x34, 0x56]);
        let _ = std::fs::remove_file(&path);
    }
}
