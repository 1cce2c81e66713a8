//! File-mode chunk reader

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use bindata_core::error::Result as CoreResult;
use bindata_core::memory::{chunk_size_for_rows, CHUNK_SAMPLE_ROWS};
use bindata_core::{Chunk, ChunkSource, Row, Schema};

use crate::error::{Error, Result};

/// Options for [`CsvChunkReader`]
#[derive(Debug, Clone)]
pub struct CsvChunkOptions {
    /// Rows per chunk; `None` sizes chunks from the first rows
    pub chunk_size: Option<usize>,

    /// Buffer size for file reads
    pub buffer_size: usize,
}

impl Default for CsvChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: None,
            buffer_size: 64 * 1024, // 64KB
        }
    }
}

/// Reads a delimited file as a sequence of fixed-size chunks
pub struct CsvChunkReader<R: Read> {
    reader: csv::Reader<R>,
    schema: Schema,
    chunk_size: usize,
    /// Rows read ahead to size chunks, handed out first
    pending: VecDeque<Row>,
    record: StringRecord,
    next_id: usize,
    exhausted: bool,
}

impl CsvChunkReader<BufReader<File>> {
    /// Open `path` for reading with a previously probed schema
    pub fn open(path: &Path, schema: Schema, options: &CsvChunkOptions) -> Result<Self> {
        let file = File::open(path)?;
        debug!(path = %path.display(), "opened input file");
        Self::from_reader(
            BufReader::with_capacity(options.buffer_size, file),
            schema,
            options.chunk_size,
        )
    }
}

impl<R: Read> CsvChunkReader<R> {
    /// Read chunks from any byte stream. A header row, if the schema has
    /// one, is skipped.
    pub fn from_reader(reader: R, schema: Schema, chunk_size: Option<usize>) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .delimiter(schema.delimiter())
            .has_headers(schema.has_header())
            .flexible(true)
            .from_reader(reader);

        let mut this = Self {
            reader,
            schema,
            chunk_size: chunk_size.unwrap_or(0),
            pending: VecDeque::new(),
            record: StringRecord::new(),
            next_id: 1,
            exhausted: false,
        };

        if this.chunk_size == 0 {
            let mut sample = Vec::with_capacity(CHUNK_SAMPLE_ROWS);
            while sample.len() < CHUNK_SAMPLE_ROWS {
                match this.read_row()? {
                    Some(row) => sample.push(row),
                    None => break,
                }
            }
            this.chunk_size = chunk_size_for_rows(&sample);
            info!(
                chunk_size = this.chunk_size,
                sampled = sample.len(),
                "chunk size adjusted to the sampled row footprint"
            );
            this.pending = sample.into();
        }

        Ok(this)
    }

    /// Rows per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.exhausted {
            return Ok(None);
        }
        if !self.reader.read_record(&mut self.record)? {
            self.exhausted = true;
            return Ok(None);
        }

        if self.record.len() != self.schema.len() {
            let line = self.record.position().map_or(0, csv::Position::line);
            return Err(Error::Input(format!(
                "line {} has {} fields, expected {}",
                line,
                self.record.len(),
                self.schema.len()
            )));
        }

        Ok(Some(Row::new(self.record.iter().map(str::to_string).collect())))
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut rows = Vec::with_capacity(self.chunk_size.min(CHUNK_SAMPLE_ROWS));
        while rows.len() < self.chunk_size {
            match self.pending.pop_front() {
                Some(row) => rows.push(row),
                None => match self.read_row()? {
                    Some(row) => rows.push(row),
                    None => break,
                },
            }
        }

        if rows.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk::new(self.next_id, rows);
        self.next_id += 1;
        Ok(Some(chunk))
    }
}

impl<R: Read> ChunkSource for CsvChunkReader<R> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_chunk(&mut self) -> CoreResult<Option<Chunk>> {
        Ok(self.read_chunk()?)
    }
}
