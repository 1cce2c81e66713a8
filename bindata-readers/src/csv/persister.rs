//! Per-label chunk files for later replay

use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::debug;

use bindata_core::error::{Error as CoreError, Result as CoreResult};
use bindata_core::{Row, RowPersister, Schema};

use super::writer::open_append;
use crate::error::Result;

/// File name prefix of persisted chunk files
pub const CHUNK_FILE_PREFIX: &str = "chunk_";

/// File name suffix of persisted chunk files
pub const CHUNK_FILE_SUFFIX: &str = ".csv";

/// File name of `label`'s chunk file. Path separators in the label are
/// replaced so the file always lands directly in the chunk directory.
pub fn chunk_file_name(label: &str) -> String {
    let safe: String = label
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{CHUNK_FILE_PREFIX}{safe}{CHUNK_FILE_SUFFIX}")
}

/// Label encoded in a chunk file name, if it is one
pub fn label_from_file_name(name: &str) -> Option<&str> {
    name.strip_prefix(CHUNK_FILE_PREFIX)?
        .strip_suffix(CHUNK_FILE_SUFFIX)
        .filter(|label| !label.is_empty())
}

/// Writes each label's sorted rows to `<dir>/chunk_<label>.csv`, comma
/// separated, with the header only when the file is created.
#[derive(Debug, Clone)]
pub struct CsvChunkPersister {
    dir: PathBuf,
}

impl CsvChunkPersister {
    /// Persist into `dir`, created on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Chunk directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `label`'s chunk file
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(chunk_file_name(label))
    }

    fn write(&self, schema: &Schema, label: &str, rows: &[Row]) -> Result<()> {
        let path = self.path_for(label);
        let (file, created) = open_append(&path)?;
        let mut writer = WriterBuilder::new().from_writer(file);

        if created {
            writer.write_record(schema.names())?;
        }
        for row in rows {
            writer.write_record(row.fields())?;
        }
        writer.flush()?;

        debug!(label, rows = rows.len(), path = %path.display(), created, "saved label rows");
        Ok(())
    }
}

impl RowPersister for CsvChunkPersister {
    fn persist(&mut self, schema: &Schema, label: &str, rows: &[Row]) -> CoreResult<()> {
        self.write(schema, label, rows)
            .map_err(|e| CoreError::persistence(label, e.to_string()))
    }
}
