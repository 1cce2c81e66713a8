//! CSV writer for binned output

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::{debug, info};

use bindata_core::binning::format_number;
use bindata_core::error::Result as CoreResult;
use bindata_core::{Bin, BinSink, Schema};

use crate::error::Result;

/// Name of the row-count column in binned output
pub const COUNT_COLUMN: &str = "count";

/// Open `path` for appending, creating it and its parent directories if
/// needed. Returns the writer and whether the file was newly created.
pub(crate) fn open_append(path: &Path) -> Result<(BufWriter<File>, bool)> {
    let created = !path.exists();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok((BufWriter::new(file), created))
}

type FileWriter = csv::Writer<BufWriter<File>>;

/// Streams bins to a comma-separated file, one label at a time.
///
/// The file is opened on the first non-empty batch. An existing file is
/// appended to without repeating the header.
pub struct CsvBinWriter {
    path: PathBuf,
    header: Vec<String>,
    precision: u32,
    writer: Option<FileWriter>,
    rows_written: usize,
}

impl CsvBinWriter {
    /// Create a writer for bins over `schema`'s value columns
    pub fn new(path: impl Into<PathBuf>, schema: &Schema, precision: u32) -> Self {
        let mut header = vec![schema.label_name().to_string(), schema.range_name().to_string()];
        header.extend(
            schema
                .value_columns()
                .into_iter()
                .map(|i| schema.field(i).name().to_string()),
        );
        header.push(COUNT_COLUMN.to_string());

        Self {
            path: path.into(),
            header,
            precision,
            writer: None,
            rows_written: 0,
        }
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Output header
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Bins written so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn open(&self) -> Result<FileWriter> {
        let (file, created) = open_append(&self.path)?;
        let mut writer = WriterBuilder::new().from_writer(file);
        if created {
            writer.write_record(&self.header)?;
        }
        debug!(path = %self.path.display(), created, "opened output file");
        Ok(writer)
    }

    fn write_bins(&mut self, bins: &[Bin]) -> Result<()> {
        if bins.is_empty() {
            return Ok(());
        }

        let mut writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.open()?,
        };

        for bin in bins {
            let mut record = Vec::with_capacity(bin.values().len() + 3);
            record.push(bin.label().to_string());
            record.push(bin.interval().to_string());
            record.extend(bin.values().iter().map(|(_, value)| {
                value
                    .map(|v| format_number(v, self.precision))
                    .unwrap_or_default()
            }));
            record.push(bin.count().to_string());
            writer.write_record(&record)?;
        }

        self.writer = Some(writer);
        self.rows_written += bins.len();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            info!(path = %self.path.display(), rows = self.rows_written, "output data saved");
        }
        Ok(())
    }
}

impl BinSink for CsvBinWriter {
    fn consume(&mut self, bins: Vec<Bin>) -> CoreResult<()> {
        Ok(self.write_bins(&bins)?)
    }

    fn flush(&mut self) -> CoreResult<()> {
        Ok(self.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindata_core::DataType;

    fn schema() -> Schema {
        Schema::synthetic(
            b'\t',
            &[DataType::String, DataType::Int64, DataType::Float64, DataType::String],
            0,
            1,
        )
        .unwrap()
    }

    fn bin(label: &str, interval: &str, value: Option<f64>, count: usize) -> Bin {
        Bin::new(label, interval, vec![("val-2".to_string(), value)], count)
    }

    #[test]
    fn test_writes_header_once_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("binned.csv");

        let mut writer = CsvBinWriter::new(&path, &schema(), 2);
        assert_eq!(writer.header(), &["label", "position", "val-2", "count"]);
        writer.consume(vec![bin("A", "10-30", Some(6.0), 2), bin("A", "30-30", Some(9.25), 1)]).unwrap();
        writer.consume(vec![bin("B", "5-15", None, 0)]).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut again = CsvBinWriter::new(&path, &schema(), 2);
        again.consume(vec![bin("C", "1-1", Some(0.5), 1)]).unwrap();
        again.flush().unwrap();
        drop(again);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "label,position,val-2,count\nA,10-30,6,2\nA,30-30,9.25,1\nB,5-15,,0\nC,1-1,0.5,1\n"
        );
    }

    #[test]
    fn test_no_file_without_bins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let mut writer = CsvBinWriter::new(&path, &schema(), 2);
        writer.consume(Vec::new()).unwrap();
        writer.flush().unwrap();

        assert!(!path.exists());
        assert_eq!(writer.rows_written(), 0);
    }
}
