//! Replay of persisted `chunk_<label>.csv` files
//!
//! Every chunk file already holds one label's complete row set, so each one
//! is handed to the pipeline as a single complete chunk.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::{info, warn};

use bindata_core::error::Result as CoreResult;
use bindata_core::{Chunk, ChunkSource, DataType, Row, Schema};

use crate::csv::label_from_file_name;
use crate::error::{Error, Result};
use crate::prober::PROBE_LINES;

/// Delimiter of persisted chunk files
pub const CHUNK_FILE_DELIMITER: u8 = b',';

/// Compare strings so that embedded numbers order by value:
/// `chunk_chr2.csv` sorts before `chunk_chr10.csv`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let l = take_digits(&mut left);
                let r = take_digits(&mut right);
                let ord = l
                    .len()
                    .cmp(&r.len())
                    .then_with(|| l.cmp(&r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Digits of a run with leading zeros dropped
fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    let trimmed = digits.trim_start_matches('0');
    trimmed.to_string()
}

fn chunk_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(label) = name.to_str().and_then(label_from_file_name) {
            files.push((label.to_string(), entry.path()));
        }
    }
    Ok(files)
}

fn open_chunk_file(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    Ok(ReaderBuilder::new()
        .delimiter(CHUNK_FILE_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(File::open(path)?)))
}

fn header_of(reader: &mut csv::Reader<BufReader<File>>) -> Result<Vec<String>> {
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

/// Chunk source over a directory of persisted per-label files
pub struct ChunkDirectoryReader {
    dir: PathBuf,
    files: VecDeque<(String, PathBuf)>,
    schema: Schema,
    next_id: usize,
}

impl ChunkDirectoryReader {
    /// List the chunk files under `dir`.
    ///
    /// With an allow list, files are read in the list's order and labels
    /// without a file are skipped; otherwise in natural file name order. The
    /// first file's header and rows define the schema.
    pub fn open(
        dir: &Path,
        label_column: usize,
        range_column: usize,
        allow_list: Option<&[String]>,
    ) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Input(format!("{} is not a directory", dir.display())));
        }

        let mut found = chunk_files(dir)?;
        let files: VecDeque<(String, PathBuf)> = match allow_list {
            Some(labels) => {
                let mut by_label: HashMap<String, PathBuf> = found.into_iter().collect();
                labels
                    .iter()
                    .filter_map(|label| match by_label.remove(label) {
                        Some(path) => Some((label.clone(), path)),
                        None => {
                            warn!(label = %label, "no chunk file for requested label");
                            None
                        }
                    })
                    .collect()
            }
            None => {
                found.sort_by(|a, b| {
                    let left = a.1.file_name().unwrap_or_default().to_string_lossy();
                    let right = b.1.file_name().unwrap_or_default().to_string_lossy();
                    natural_cmp(&left, &right)
                });
                found.into()
            }
        };

        let Some((_, first)) = files.front() else {
            return Err(Error::Input(format!(
                "no chunk_<label>.csv files found in {}",
                dir.display()
            )));
        };

        let schema = Self::probe(first, label_column, range_column)?;
        info!(
            dir = %dir.display(),
            files = files.len(),
            columns = ?schema.names(),
            "replaying persisted chunk files"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            schema,
            next_id: 1,
        })
    }

    fn probe(path: &Path, label_column: usize, range_column: usize) -> Result<Schema> {
        let mut reader = open_chunk_file(path)?;
        let header = header_of(&mut reader)?;

        let mut sample = Vec::new();
        for record in reader.records().take(PROBE_LINES) {
            sample.push(record?.iter().map(str::to_string).collect::<Vec<_>>());
        }
        let types = DataType::infer_columns(&sample, header.len());

        Ok(Schema::named(
            CHUNK_FILE_DELIMITER,
            true,
            &header,
            &types,
            label_column,
            range_column,
        )?)
    }

    /// Directory being replayed
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Labels still to be read, in order
    pub fn labels(&self) -> Vec<&str> {
        self.files.iter().map(|(label, _)| label.as_str()).collect()
    }

    fn read_file(&self, path: &Path) -> Result<Vec<Row>> {
        let mut reader = open_chunk_file(path)?;
        let header = header_of(&mut reader)?;
        if header.iter().map(String::as_str).ne(self.schema.names()) {
            return Err(Error::Input(format!(
                "{} has header {:?}, expected {:?}",
                path.display(),
                header,
                self.schema.names()
            )));
        }

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            if record.len() != self.schema.len() {
                return Err(Error::Input(format!(
                    "{} line {} has {} fields, expected {}",
                    path.display(),
                    record.position().map_or(0, csv::Position::line),
                    record.len(),
                    self.schema.len()
                )));
            }
            rows.push(Row::new(record.iter().map(str::to_string).collect()));
        }
        Ok(rows)
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let Some((file_label, path)) = self.files.pop_front() else {
            return Ok(None);
        };

        let rows = self.read_file(&path)?;
        let label = rows
            .first()
            .and_then(|row| row.get(self.schema.label_index()))
            .map_or(file_label, str::to_string);

        info!(label = %label, rows = rows.len(), path = %path.display(), "loading chunk file");
        let chunk = Chunk::complete(self.next_id, Some(label), rows);
        self.next_id += 1;
        Ok(Some(chunk))
    }
}

impl ChunkSource for ChunkDirectoryReader {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_chunk(&mut self) -> CoreResult<Option<Chunk>> {
        Ok(self.read_chunk()?)
    }

    fn is_replay(&self) -> bool {
        true
    }
}
