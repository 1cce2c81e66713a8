//! Delimited-text chunk reader, bin writer and chunk file persister

mod persister;
mod reader;
mod writer;

pub use persister::{
    chunk_file_name, label_from_file_name, CsvChunkPersister, CHUNK_FILE_PREFIX, CHUNK_FILE_SUFFIX,
};
pub use reader::{CsvChunkOptions, CsvChunkReader};
pub use writer::{CsvBinWriter, COUNT_COLUMN};
