//! Delimited-text sources and sinks for bin-data pipelines
//!
//! This crate probes raw input for its delimiter and header, reads it as
//! bounded chunks, replays directories of persisted per-label chunk files,
//! and writes binned output, chunk files and the per-label report.

#![warn(missing_docs)]

mod error;

pub mod csv;
pub mod directory;
pub mod factory;
pub mod label_list;
pub mod prober;
pub mod report;

pub use crate::csv::{CsvBinWriter, CsvChunkOptions, CsvChunkPersister, CsvChunkReader};
pub use directory::{natural_cmp, ChunkDirectoryReader};
pub use error::{Error, Result};
pub use factory::{ChunkSourceFactory, InputMode};
pub use label_list::load_label_list;
pub use prober::{detect_header, sniff_delimiter, SchemaProber};
pub use report::write_report_file;

// Re-export core types
pub use bindata_core::{ChunkSource, DataType, Field, Schema};
