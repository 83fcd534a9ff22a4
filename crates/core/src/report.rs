//! Machine-readable run report and its on-disk format.
//!
//! A surrounding harness checks outcomes from the report rather than parsing
//! log text. The file is bincode-serialized and deflate-compressed.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "QSPB"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::BenchError;

/// Magic bytes identifying a qspi-bench report file.
const MAGIC: &[u8; 4] = b"QSPB";
/// Current report format version.
const FORMAT_VERSION: u32 = 1;

/// Outcome and statistics of one bench run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub passed: bool,
    /// Failure description when `passed` is false.
    pub failure: Option<String>,
    pub nibbles_transferred: usize,
    pub expected_nibbles: usize,
    pub rising_edges: u64,
    pub simulated_ns: u64,
    pub captured_pixels: usize,
    pub frame_complete: bool,
    // Configuration echo, so a report is interpretable on its own.
    pub leading_blank_threshold: u32,
    pub drain_cycles: u32,
    pub handshake_timeout: u32,
    pub hold_line_bit: u8,
}

impl RunReport {
    pub fn save(&self, path: &Path) -> Result<(), BenchError> {
        let payload =
            bincode::serialize(self).map_err(|e| BenchError::Report(e.to_string()))?;
        let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

        let mut out = Vec::with_capacity(8 + compressed.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&compressed);
        fs::write(path, out)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<RunReport, BenchError> {
        let raw = fs::read(path)?;
        if raw.len() < 8 || &raw[0..4] != MAGIC {
            return Err(BenchError::Report("missing QSPB magic".into()));
        }
        let version = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if version != FORMAT_VERSION {
            return Err(BenchError::Report(format!("unsupported format version {version}")));
        }
        let payload = miniz_oxide::inflate::decompress_to_vec(&raw[8..])
            .map_err(|e| BenchError::Report(format!("decompress: {e:?}")))?;
        bincode::deserialize(&payload).map_err(|e| BenchError::Report(e.to_string()))
    }
}
