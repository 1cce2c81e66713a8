//! Rows and chunks, the units the pipeline moves around

use std::mem;

/// One decoded row of the input, one string per column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    /// Create a row from its field values
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field value at `index`, if present
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// All field values in column order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Field at `index` parsed as a number. Blank and unparsable cells are `None`.
    pub fn number(&self, index: usize) -> Option<f64> {
        self.get(index)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| !v.is_nan())
    }

    /// Estimated in-memory footprint of this row in bytes: the vector header,
    /// one string header per field, and the field bytes.
    pub fn footprint(&self) -> usize {
        mem::size_of::<Vec<String>>()
            + self.fields.len() * mem::size_of::<String>()
            + self.fields.iter().map(String::len).sum::<usize>()
    }
}

impl From<Vec<String>> for Row {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl From<Vec<&str>> for Row {
    fn from(fields: Vec<&str>) -> Self {
        Self::new(fields.into_iter().map(str::to_string).collect())
    }
}

/// A bounded block of rows read from the source.
///
/// File-mode chunks are arbitrary slices of the input and are folded into the
/// label accumulator row by row. A `complete` chunk (directory replay) already
/// holds a label's full row set and is flushed as a single group.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    id: usize,
    label: Option<String>,
    rows: Vec<Row>,
    complete: bool,
}

impl Chunk {
    /// Create a streaming chunk
    pub fn new(id: usize, rows: Vec<Row>) -> Self {
        Self {
            id,
            label: None,
            rows,
            complete: false,
        }
    }

    /// Create a chunk that holds one label's complete row set. `label` names
    /// the label when it is known without looking at the rows.
    pub fn complete(id: usize, label: Option<String>, rows: Vec<Row>) -> Self {
        Self {
            id,
            label,
            rows,
            complete: true,
        }
    }

    /// Chunk id, increasing from 1 within a run
    pub fn id(&self) -> usize {
        self.id
    }

    /// Label of a complete chunk, when known
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Rows in source order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the chunk has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether this chunk is already a full per-label row set
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Take ownership of the rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Estimated in-memory footprint of all rows in bytes
    pub fn footprint(&self) -> usize {
        footprint_of(&self.rows)
    }
}

/// Estimated footprint in bytes of a slice of rows
pub fn footprint_of(rows: &[Row]) -> usize {
    rows.iter().map(Row::footprint).sum()
}
