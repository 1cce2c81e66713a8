//! Memory footprint accounting and chunk sizing

use crate::chunk::{footprint_of, Row};

/// Number of rows sampled to size chunks automatically
pub const CHUNK_SAMPLE_ROWS: usize = 1000;

/// Footprint target per chunk, in kilobytes of the sample
pub const CHUNK_TARGET_UNITS: f64 = 250_000.0;

/// Chunk sizes are multiples of this many rows
pub const CHUNK_ROUNDING: usize = 1000;

/// Derive a chunk size in rows from the footprint (in bytes) of a
/// [`CHUNK_SAMPLE_ROWS`]-row sample.
///
/// The sample footprint is expressed in kilobytes (rounded, at least 1), and
/// the chunk size is `round(250000 / kb) * 1000`, never less than 1000.
pub fn chunk_size_for_sample(sample_bytes: usize) -> usize {
    #[allow(clippy::cast_precision_loss)]
    let kb = (sample_bytes as f64 / 1024.0).round().max(1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let multiple = (CHUNK_TARGET_UNITS / kb).round() as usize;
    (multiple * CHUNK_ROUNDING).max(CHUNK_ROUNDING)
}

/// Chunk size for a sample of rows, see [`chunk_size_for_sample`]
pub fn chunk_size_for_rows(sample: &[Row]) -> usize {
    chunk_size_for_sample(footprint_of(sample))
}

/// Running footprint statistics for one label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Rows seen
    pub rows: usize,

    /// Estimated footprint of those rows in bytes
    pub bytes: usize,
}

impl MemoryStats {
    /// Add a flushed group's rows to the totals
    pub fn record(&mut self, rows: &[Row]) {
        self.rows += rows.len();
        self.bytes += footprint_of(rows);
    }

    /// Footprint in megabytes
    pub fn megabytes(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let bytes = self.bytes as f64;
        bytes / 1024.0 / 1024.0
    }

    /// Footprint formatted like `0.25MB`
    pub fn display_megabytes(&self) -> String {
        format!("{:.2}MB", self.megabytes())
    }
}
