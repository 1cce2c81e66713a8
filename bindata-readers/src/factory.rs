//! Chunk source selection from an input path

use std::path::{Path, PathBuf};

use tracing::info;

use bindata_core::{ChunkSource, RunConfig};

use crate::csv::{CsvChunkOptions, CsvChunkReader};
use crate::directory::ChunkDirectoryReader;
use crate::error::{Error, Result};
use crate::prober::SchemaProber;

/// How the input path is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// A single delimited file, read in chunks
    File,

    /// A directory of persisted `chunk_<label>.csv` files
    Directory,
}

impl InputMode {
    /// Mode for `path`, failing when it is neither a file nor a directory
    pub fn detect(path: &Path) -> Result<Self> {
        if path.is_file() {
            Ok(InputMode::File)
        } else if path.is_dir() {
            Ok(InputMode::Directory)
        } else {
            Err(Error::Input(format!(
                "{} is neither a readable file nor a directory",
                path.display()
            )))
        }
    }
}

/// Builds the chunk source for a run
#[derive(Debug, Clone)]
pub struct ChunkSourceFactory {
    input: PathBuf,
    label_column: usize,
    range_column: usize,
    column_names: Option<Vec<String>>,
    chunk_size: Option<usize>,
    labels: Option<Vec<String>>,
}

impl ChunkSourceFactory {
    /// Take the source options from `config`; `labels` is the parsed allow list
    pub fn from_config(config: &RunConfig, labels: Option<Vec<String>>) -> Self {
        Self {
            input: config.input.clone(),
            label_column: config.label_column,
            range_column: config.range_column,
            column_names: config.column_names.clone(),
            chunk_size: config.fixed_chunk_size(),
            labels,
        }
    }

    /// Mode the input path selects
    pub fn mode(&self) -> Result<InputMode> {
        InputMode::detect(&self.input)
    }

    /// Open the source: a probed chunk reader for a file, a replay reader
    /// for a directory.
    pub fn create(&self) -> Result<Box<dyn ChunkSource>> {
        match self.mode()? {
            InputMode::File => {
                let schema = SchemaProber::new(self.label_column, self.range_column)
                    .with_column_names(self.column_names.clone())
                    .probe_path(&self.input)?;
                let options = CsvChunkOptions {
                    chunk_size: self.chunk_size,
                    ..CsvChunkOptions::default()
                };
                let reader = CsvChunkReader::open(&self.input, schema, &options)?;
                info!(
                    input = %self.input.display(),
                    chunk_size = reader.chunk_size(),
                    "reading input file in chunks"
                );
                Ok(Box::new(reader))
            }
            InputMode::Directory => {
                let reader = ChunkDirectoryReader::open(
                    &self.input,
                    self.label_column,
                    self.range_column,
                    self.labels.as_deref(),
                )?;
                Ok(Box::new(reader))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_detection() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.tsv");
        std::fs::write(&file, "A\t1\t2\n").unwrap();

        assert_eq!(InputMode::detect(&file).unwrap(), InputMode::File);
        assert_eq!(InputMode::detect(dir.path()).unwrap(), InputMode::Directory);
        assert!(matches!(
            InputMode::detect(&dir.path().join("missing")),
            Err(Error::Input(_))
        ));
    }

    #[test]
    fn test_create_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.tsv");
        std::fs::write(&file, "A\t1\t2\nA\t2\t3\nB\t1\t4\n").unwrap();

        let config = RunConfig {
            input: file,
            chunk_size: 2,
            ..RunConfig::default()
        };
        let mut source = ChunkSourceFactory::from_config(&config, None).create().unwrap();

        assert!(!source.is_replay());
        assert_eq!(source.schema().delimiter(), b'\t');
        assert_eq!(source.next_chunk().unwrap().unwrap().len(), 2);
        assert_eq!(source.next_chunk().unwrap().unwrap().len(), 1);
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_create_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chunk_A.csv"), "label,position\nA,1\n").unwrap();

        let config = RunConfig {
            input: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        let source = ChunkSourceFactory::from_config(&config, None).create().unwrap();
        assert!(source.is_replay());
    }
}
