//! Core types and the streaming engine for binning labelled tabular data
//!
//! Rows are read in bounded chunks, regrouped into per-label row sets as they
//! stream past, sorted along a range column and reduced into fixed-size bins.
//! This crate holds everything that does not touch a file format: the row and
//! chunk model, the label accumulator, slicing strategies, aggregation and the
//! pipeline that drives a [`ChunkSource`] into a [`BinSink`].

#![warn(missing_docs)]

pub mod accumulator;
pub mod binning;
pub mod chunk;
pub mod config;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod sink;
pub mod source;

// Re-export key types for convenience
pub use accumulator::{AccumulatorState, LabelAccumulator, LabelGroup};
pub use binning::{Aggregation, Bin, BinningEngine, Partition, SlicePolicy, SliceStrategy};
pub use chunk::{Chunk, Row};
pub use config::RunConfig;
pub use error::{Error, Result};
pub use memory::MemoryStats;
pub use pipeline::Pipeline;
pub use report::{LabelDiagnostics, LabelEntry, LabelFailure, RunSummary};
pub use schema::{DataType, Field, Schema};
pub use sink::{BinSink, RowPersister};
pub use source::ChunkSource;
