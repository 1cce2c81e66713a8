//! Report file output

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::info;

use bindata_core::LabelDiagnostics;

use crate::error::Result;

/// Write the per-label report to `path`, replacing any previous report
pub fn write_report_file(path: &Path, diagnostics: &LabelDiagnostics) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    diagnostics.write_report(writer)?;
    info!(path = %path.display(), labels = diagnostics.len(), "label report saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindata_core::Row;

    #[test]
    fn test_report_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_in_chunks.txt");
        std::fs::write(&path, "stale\n").unwrap();

        let mut diagnostics = LabelDiagnostics::default();
        diagnostics.note_chunk("chr1", 3);
        diagnostics.record_rows("chr1", &[Row::from(vec!["chr1", "1"])]);
        write_report_file(&path, &diagnostics).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "chr1,1,0.00MB,[3]\n");
    }
}
