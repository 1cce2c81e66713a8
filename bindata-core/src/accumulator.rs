//! Label accumulation across chunk boundaries
//!
//! The accumulator folds chunks row by row and emits one [`LabelGroup`] each
//! time the label column changes, plus a final group when the stream ends.
//!
//! Grouping is by *contiguous runs*: input is expected to be pre-sorted by
//! label upstream. A label that reappears after another label (`A, A, B, A`)
//! opens a second, independent group for `A` rather than being merged with
//! the first one. Both groups are binned separately; only the diagnostics are
//! summed per label.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::mem;

use tracing::{debug, info};

use crate::chunk::{Chunk, Row};
use crate::error::{Error, Result};
use crate::report::LabelDiagnostics;

/// A label's complete row set for one contiguous run
#[derive(Debug, Clone, PartialEq)]
pub struct LabelGroup {
    label: String,
    rows: Vec<Row>,
    chunk_ids: Vec<usize>,
}

impl LabelGroup {
    /// Create a group
    pub fn new(label: impl Into<String>, rows: Vec<Row>, chunk_ids: Vec<usize>) -> Self {
        Self {
            label: label.into(),
            rows,
            chunk_ids,
        }
    }

    /// Label value
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Rows in their current order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Ids of the chunks this run spanned
    pub fn chunk_ids(&self) -> &[usize] {
        &self.chunk_ids
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the group has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stable ascending sort along the range column.
    ///
    /// When any range value is numeric, rows sort by number and rows with a
    /// blank or non-numeric range keep their relative order at the end.
    /// When none is numeric, rows sort by the trimmed range text. A row that
    /// has no range column at all leaves the rows untouched and is an error.
    pub fn sort_by_range(&mut self, range_index: usize) -> Result<()> {
        if let Some(i) = self.rows.iter().position(|r| r.get(range_index).is_none()) {
            return Err(Error::InvalidArgument(format!(
                "row {i} has no range column {range_index}"
            )));
        }

        let rows = mem::take(&mut self.rows);
        let mut keyed: Vec<(Option<f64>, Row)> =
            rows.into_iter().map(|r| (r.number(range_index), r)).collect();

        if keyed.iter().any(|(key, _)| key.is_some()) {
            keyed.sort_by(|a, b| match (a.0, b.0) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        } else {
            keyed.sort_by(|a, b| {
                let left = a.1.get(range_index).unwrap_or_default().trim();
                let right = b.1.get(range_index).unwrap_or_default().trim();
                left.cmp(right)
            });
        }
        self.rows = keyed.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }

    /// Split into label and rows
    pub fn into_parts(self) -> (String, Vec<Row>) {
        (self.label, self.rows)
    }
}

/// Accumulator state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AccumulatorState {
    /// No label open
    #[default]
    Idle,

    /// Buffering rows for `label`
    Open {
        /// Label being buffered
        label: String,
        /// Rows buffered so far
        rows: Vec<Row>,
        /// Chunks the buffered rows came from
        chunk_ids: Vec<usize>,
    },
}

/// Folds chunks into per-label groups, see the module docs
#[derive(Debug)]
pub struct LabelAccumulator {
    label_index: usize,
    allow_list: Option<HashSet<String>>,
    state: AccumulatorState,
    diagnostics: LabelDiagnostics,
}

impl LabelAccumulator {
    /// Create an idle accumulator reading labels from `label_index`
    pub fn new(label_index: usize) -> Self {
        Self {
            label_index,
            allow_list: None,
            state: AccumulatorState::Idle,
            diagnostics: LabelDiagnostics::default(),
        }
    }

    /// Only accept rows whose label is in `labels`. Other rows are skipped
    /// entirely and never counted.
    pub fn with_allow_list<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Current state
    pub fn state(&self) -> &AccumulatorState {
        &self.state
    }

    /// Label currently being buffered, if any
    pub fn current_label(&self) -> Option<&str> {
        match &self.state {
            AccumulatorState::Idle => None,
            AccumulatorState::Open { label, .. } => Some(label),
        }
    }

    /// Diagnostics gathered so far
    pub fn diagnostics(&self) -> &LabelDiagnostics {
        &self.diagnostics
    }

    /// Give up the diagnostics at the end of a run
    pub fn into_diagnostics(self) -> LabelDiagnostics {
        self.diagnostics
    }

    fn is_allowed(&self, label: &str) -> bool {
        self.allow_list
            .as_ref()
            .map_or(true, |allowed| allowed.contains(label))
    }

    /// Fold one chunk in, returning every group completed by it in order.
    ///
    /// A complete (replay) chunk closes any open label and becomes a group
    /// of its own.
    pub fn push_chunk(&mut self, chunk: Chunk) -> Vec<LabelGroup> {
        let mut completed = Vec::new();
        let chunk_id = chunk.id();

        if chunk.is_complete() {
            completed.extend(self.finish());

            let label = chunk
                .label()
                .map(str::to_string)
                .or_else(|| {
                    chunk
                        .rows()
                        .first()
                        .and_then(|row| row.get(self.label_index))
                        .map(str::to_string)
                })
                .unwrap_or_default();

            if !self.is_allowed(&label) {
                debug!(label = %label, chunk_id, "skipping chunk for label outside the allow list");
                return completed;
            }

            info!(label = %label, chunk_id, "creating dataframe for a label");
            self.diagnostics.note_chunk(&label, chunk_id);
            let rows = chunk.into_rows();
            self.diagnostics.record_rows(&label, &rows);
            completed.push(LabelGroup::new(label, rows, vec![chunk_id]));
            return completed;
        }

        for row in chunk.into_rows() {
            let label = row.get(self.label_index).unwrap_or_default().to_string();
            if !self.is_allowed(&label) {
                continue;
            }
            self.diagnostics.note_chunk(&label, chunk_id);

            let continues = matches!(
                &self.state,
                AccumulatorState::Open { label: open, .. } if *open == label
            );

            if continues {
                if let AccumulatorState::Open {
                    rows, chunk_ids, ..
                } = &mut self.state
                {
                    if chunk_ids.last() != Some(&chunk_id) {
                        chunk_ids.push(chunk_id);
                    }
                    rows.push(row);
                }
            } else {
                completed.extend(self.finish());
                info!(label = %label, chunk_id, "creating dataframe for a label");
                self.state = AccumulatorState::Open {
                    label,
                    rows: vec![row],
                    chunk_ids: vec![chunk_id],
                };
            }
        }

        completed
    }

    /// Flush the open label, if any, and return to idle
    pub fn finish(&mut self) -> Option<LabelGroup> {
        match mem::take(&mut self.state) {
            AccumulatorState::Idle => None,
            AccumulatorState::Open {
                label,
                rows,
                chunk_ids,
            } => {
                self.diagnostics.record_rows(&label, &rows);
                debug!(label = %label, rows = rows.len(), "flushing label");
                Some(LabelGroup::new(label, rows, chunk_ids))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, pos: u32) -> Row {
        Row::from(vec![label.to_string(), pos.to_string(), "1.0".to_string()])
    }

    fn labels(groups: &[LabelGroup]) -> Vec<(&str, usize)> {
        groups.iter().map(|g| (g.label(), g.len())).collect()
    }

    #[test]
    fn test_label_spans_chunks() {
        let mut acc = LabelAccumulator::new(0);

        let first = acc.push_chunk(Chunk::new(1, vec![row("A", 1), row("A", 2)]));
        assert!(first.is_empty());
        assert_eq!(acc.current_label(), Some("A"));

        let second = acc.push_chunk(Chunk::new(2, vec![row("A", 3), row("B", 1)]));
        assert_eq!(labels(&second), vec![("A", 3)]);
        assert_eq!(second[0].chunk_ids(), &[1, 2]);

        let last = acc.finish().unwrap();
        assert_eq!(last.label(), "B");
        assert_eq!(last.chunk_ids(), &[2]);
        assert_eq!(acc.state(), &AccumulatorState::Idle);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_non_contiguous_label_opens_new_group() {
        let mut acc = LabelAccumulator::new(0);
        let mut groups = acc.push_chunk(Chunk::new(
            1,
            vec![row("A", 1), row("A", 2), row("B", 1), row("A", 3)],
        ));
        groups.extend(acc.finish());

        assert_eq!(labels(&groups), vec![("A", 2), ("B", 1), ("A", 1)]);

        let diag = acc.diagnostics();
        assert_eq!(diag.labels(), vec!["A", "B"]);
        assert_eq!(diag.get("A").unwrap().stats.rows, 3);
    }

    #[test]
    fn test_allow_list_skips_rows() {
        let mut acc = LabelAccumulator::new(0).with_allow_list(["B"]);
        let mut groups = acc.push_chunk(Chunk::new(1, vec![row("A", 1), row("B", 1)]));
        groups.extend(acc.push_chunk(Chunk::new(2, vec![row("A", 2), row("B", 2)])));
        groups.extend(acc.finish());

        assert_eq!(labels(&groups), vec![("B", 2)]);
        assert_eq!(acc.diagnostics().labels(), vec!["B"]);
        assert!(acc.diagnostics().get("A").is_none());
    }

    #[test]
    fn test_complete_chunk_closes_open_label() {
        let mut acc = LabelAccumulator::new(0);
        acc.push_chunk(Chunk::new(1, vec![row("A", 1)]));
        let groups = acc.push_chunk(Chunk::complete(2, Some("B".into()), vec![row("B", 5), row("B", 4)]));

        assert_eq!(labels(&groups), vec![("A", 1), ("B", 2)]);
        assert_eq!(acc.state(), &AccumulatorState::Idle);
    }

    #[test]
    fn test_sort_by_range_is_stable() {
        let mut group = LabelGroup::new(
            "A",
            vec![
                Row::from(vec!["A", "30", "x"]),
                Row::from(vec!["A", "10", "y"]),
                Row::from(vec!["A", "30", "z"]),
                Row::from(vec!["A", "2.5", "w"]),
            ],
            vec![1],
        );
        group.sort_by_range(1).unwrap();

        let tags: Vec<&str> = group.rows().iter().map(|r| r.get(2).unwrap()).collect();
        assert_eq!(tags, vec!["w", "y", "x", "z"]);
    }

    fn range_order(rows: &[(&str, &str)]) -> Vec<String> {
        let rows = rows.iter().map(|&(p, tag)| Row::from(vec!["A", p, tag])).collect();
        let mut group = LabelGroup::new("A", rows, vec![1]);
        group.sort_by_range(1).unwrap();
        group.rows().iter().map(|r| r.get(2).unwrap().to_string()).collect()
    }

    #[test]
    fn test_sort_puts_missing_ranges_last() {
        let order = range_order(&[("30", "a"), ("10", "b"), ("", "c"), ("20", "d"), ("NA", "e")]);
        assert_eq!(order, vec!["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn test_sort_text_ranges_lexically() {
        let order = range_order(&[("b", "1"), ("a", "2"), (" c", "3"), ("a", "4")]);
        assert_eq!(order, vec!["2", "4", "1", "3"]);
    }

    #[test]
    fn test_sort_without_range_column_keeps_order() {
        let original = vec![Row::from(vec!["A", "2"]), Row::from(vec!["A"])];
        let mut group = LabelGroup::new("A", original.clone(), vec![1]);

        assert!(group.sort_by_range(1).is_err());
        assert_eq!(group.rows(), original.as_slice());
    }
}
