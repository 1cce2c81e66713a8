//! Delimiter sniffing and header inference

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{info, warn};

use bindata_core::{DataType, Schema};

use crate::error::{Error, Result};

/// Lines sampled for delimiter sniffing and column typing
pub const PROBE_LINES: usize = 100;

/// Rows compared when deciding whether the first line is a header
pub const HEADER_PROBE_ROWS: usize = 10;

/// Type agreement at or above which the first line is treated as data
pub const HEADER_AGREEMENT: f64 = 0.9;

/// Delimiters tried, most preferred first
pub const DELIMITER_CANDIDATES: [u8; 5] = [b',', b'\t', b';', b'|', b' '];

fn split_records(sample: &str, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

fn show(delimiter: u8) -> String {
    char::from(delimiter).escape_debug().to_string()
}

/// Pick the delimiter that splits every sampled line into the same number
/// (at least two) of fields.
///
/// Candidates agreeing on the column count resolve by preference order;
/// candidates disagreeing make the sample ambiguous.
pub fn sniff_delimiter(sample: &str) -> Result<u8> {
    let mut qualified: Vec<(u8, usize)> = Vec::new();

    for &candidate in &DELIMITER_CANDIDATES {
        let Ok(records) = split_records(sample, candidate) else {
            continue;
        };
        let Some(width) = records.first().map(Vec::len) else {
            continue;
        };
        if width >= 2 && records.iter().all(|r| r.len() == width) {
            qualified.push((candidate, width));
        }
    }

    match qualified.as_slice() {
        [] => Err(Error::Schema(
            "no delimiter splits every sampled line into the same number of columns".into(),
        )),
        [(first, width), rest @ ..] if rest.iter().all(|(_, w)| w == width) => Ok(*first),
        _ => {
            let found: Vec<String> = qualified
                .iter()
                .map(|(d, w)| format!("'{}' ({} columns)", show(*d), w))
                .collect();
            Err(Error::Schema(format!(
                "ambiguous delimiter, candidates: {}",
                found.join(", ")
            )))
        }
    }
}

/// Whether the first record looks like a header.
///
/// The first [`HEADER_PROBE_ROWS`] rows are typed once as-is and once with the
/// first row dropped. Column types that mostly agree mean the first row is
/// ordinary data.
pub fn detect_header(records: &[Vec<String>]) -> bool {
    if records.len() < 2 {
        return false;
    }
    let width = records[0].len();
    if width == 0 {
        return false;
    }

    let without_header = &records[..records.len().min(HEADER_PROBE_ROWS)];
    let with_header = &records[1..records.len().min(HEADER_PROBE_ROWS + 1)];

    let plain = DataType::infer_columns(without_header, width);
    let skipped = DataType::infer_columns(with_header, width);
    let agreeing = plain.iter().zip(&skipped).filter(|(a, b)| a == b).count();

    #[allow(clippy::cast_precision_loss)]
    let agreement = agreeing as f64 / width as f64;
    agreement < HEADER_AGREEMENT
}

/// Infers a [`Schema`] from the head of a delimited file
#[derive(Debug, Clone)]
pub struct SchemaProber {
    label_column: usize,
    range_column: usize,
    column_names: Option<Vec<String>>,
}

impl SchemaProber {
    /// Create a prober for the given label and range column indices
    pub fn new(label_column: usize, range_column: usize) -> Self {
        Self {
            label_column,
            range_column,
            column_names: None,
        }
    }

    /// Use these names when their count matches the sampled column count
    pub fn with_column_names(mut self, names: Option<Vec<String>>) -> Self {
        self.column_names = names;
        self
    }

    /// Sample the head of `path` and infer its schema
    pub fn probe_path(&self, path: &Path) -> Result<Schema> {
        let reader = BufReader::new(File::open(path)?);
        let mut sample = String::new();
        for line in reader.lines().take(PROBE_LINES) {
            sample.push_str(&line?);
            sample.push('\n');
        }

        if sample.trim().is_empty() {
            return Err(Error::Schema(format!("{} is empty", path.display())));
        }
        self.probe_sample(&sample)
    }

    /// Infer the schema of an in-memory sample
    pub fn probe_sample(&self, sample: &str) -> Result<Schema> {
        let delimiter = sniff_delimiter(sample)?;
        let records = split_records(sample, delimiter)?;
        let width = records.first().map_or(0, Vec::len);
        let has_header = detect_header(&records);

        let data = if has_header { &records[1..] } else { &records[..] };
        let types = DataType::infer_columns(data, width);

        let schema = match &self.column_names {
            Some(names) if names.len() == width => Schema::named(
                delimiter,
                has_header,
                names,
                &types,
                self.label_column,
                self.range_column,
            )?,
            Some(names) => {
                warn!(
                    expected = width,
                    given = names.len(),
                    "custom header does not match the number of columns, ignoring it"
                );
                self.inferred(delimiter, has_header, &records, &types)?
            }
            None => self.inferred(delimiter, has_header, &records, &types)?,
        };

        info!(
            delimiter = %show(delimiter),
            has_header,
            columns = ?schema.names(),
            "assigned data header"
        );
        Ok(schema)
    }

    fn inferred(
        &self,
        delimiter: u8,
        has_header: bool,
        records: &[Vec<String>],
        types: &[DataType],
    ) -> Result<Schema> {
        let schema = if has_header {
            let names: Vec<String> = records[0].iter().map(|n| n.trim().to_string()).collect();
            Schema::named(
                delimiter,
                true,
                &names,
                types,
                self.label_column,
                self.range_column,
            )?
        } else {
            Schema::synthetic(delimiter, types, self.label_column, self.range_column)?
        };
        Ok(schema)
    }
}
