//! Per-label diagnostics and the run summary

use std::collections::HashMap;
use std::io::Write;

use crate::chunk::Row;
use crate::error::Result;
use crate::memory::MemoryStats;

/// Diagnostics for one label, accumulated over the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelEntry {
    /// Ids of every chunk the label appeared in, ascending
    pub chunk_ids: Vec<usize>,

    /// Row count and footprint over all of the label's groups
    pub stats: MemoryStats,
}

impl LabelEntry {
    /// Report line: `label,row_count,memory_estimate,chunk_id_list`
    pub fn report_line(&self, label: &str) -> String {
        let ids: Vec<String> = self.chunk_ids.iter().map(ToString::to_string).collect();
        format!(
            "{},{},{},[{}]",
            label,
            self.stats.rows,
            self.stats.display_megabytes(),
            ids.join(", ")
        )
    }
}

/// Label → diagnostics, remembering the order labels were first seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDiagnostics {
    order: Vec<String>,
    entries: HashMap<String, LabelEntry>,
}

impl LabelDiagnostics {
    fn entry(&mut self, label: &str) -> &mut LabelEntry {
        if !self.entries.contains_key(label) {
            self.order.push(label.to_string());
        }
        self.entries.entry(label.to_string()).or_default()
    }

    /// Note that `label` appeared in chunk `chunk_id`
    pub fn note_chunk(&mut self, label: &str, chunk_id: usize) {
        let entry = self.entry(label);
        if !entry.chunk_ids.contains(&chunk_id) {
            entry.chunk_ids.push(chunk_id);
            entry.chunk_ids.sort_unstable();
        }
    }

    /// Add a flushed group's rows to `label`'s totals
    pub fn record_rows(&mut self, label: &str, rows: &[Row]) {
        self.entry(label).stats.record(rows);
    }

    /// Diagnostics for `label`
    pub fn get(&self, label: &str) -> Option<&LabelEntry> {
        self.entries.get(label)
    }

    /// Labels in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// `(label, entry)` pairs in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabelEntry)> {
        self.order
            .iter()
            .filter_map(|label| self.entries.get(label).map(|e| (label.as_str(), e)))
    }

    /// Number of labels seen
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no label was seen
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Write the plain-text report, one line per label
    pub fn write_report<W: Write>(&self, mut writer: W) -> Result<()> {
        for (label, entry) in self.iter() {
            writeln!(writer, "{}", entry.report_line(label))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// A label group that could not be binned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFailure {
    /// Label of the failed group
    pub label: String,

    /// Rows the group held
    pub rows: usize,

    /// Why it failed
    pub reason: String,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Chunks pulled from the source
    pub chunks_read: usize,

    /// Label groups flushed by the accumulator
    pub groups_flushed: usize,

    /// Bins handed to the sink
    pub bins_emitted: usize,

    /// Groups whose rows could not be persisted
    pub persistence_failures: usize,

    /// Groups skipped because binning failed
    pub failures: Vec<LabelFailure>,

    /// Per-label diagnostics
    pub diagnostics: LabelDiagnostics,
}

impl RunSummary {
    /// Whether every group was binned
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lines_in_first_seen_order() {
        let mut diag = LabelDiagnostics::default();
        diag.note_chunk("chr2", 1);
        diag.note_chunk("chr1", 1);
        diag.note_chunk("chr1", 2);
        diag.note_chunk("chr1", 2);
        diag.record_rows("chr2", &[Row::from(vec!["chr2", "1"])]);
        diag.record_rows("chr1", &[Row::from(vec!["chr1", "1"]), Row::from(vec!["chr1", "2"])]);

        let mut out = Vec::new();
        diag.write_report(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text, "chr2,1,0.00MB,[1]\nchr1,2,0.00MB,[1, 2]\n");
    }
}
