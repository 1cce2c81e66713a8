//! Run configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::binning::{Aggregation, BinningEngine, SlicePolicy, SliceStrategy, MAX_PRECISION};
use crate::error::{Error, Result};

/// Every option a binning run recognizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Delimited input file, or a directory of `chunk_<label>.csv` files
    pub input: PathBuf,

    /// 0-based index of the label column
    pub label_column: usize,

    /// 0-based index of the range column
    pub range_column: usize,

    /// Comma-separated labels, or a path to a newline-delimited list.
    /// Empty means every label.
    pub label_list: String,

    /// Custom column names, used when their count matches the input
    pub column_names: Option<Vec<String>>,

    /// Rows per chunk; 0 sizes chunks from a sample
    pub chunk_size: usize,

    /// Write each label's raw rows to `chunks_dir/chunk_<label>.csv`
    pub persist_chunks: bool,

    /// Directory for persisted chunk files
    pub chunks_dir: PathBuf,

    /// Mean or sum
    pub aggregation: Aggregation,

    /// Step, bin or value slicing
    pub slice_policy: SlicePolicy,

    /// Rows per bin, bins per label, or bucket width
    pub slice_size: f64,

    /// Decimal places of aggregated values
    pub decimal_precision: u32,

    /// Binned output file; `.csv` is appended when missing
    pub output_path: PathBuf,

    /// Per-label diagnostic report
    pub report_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            label_column: 0,
            range_column: 1,
            label_list: String::new(),
            column_names: None,
            chunk_size: 0,
            persist_chunks: true,
            chunks_dir: PathBuf::from("CHUNKS"),
            aggregation: Aggregation::Mean,
            slice_policy: SlicePolicy::Step,
            slice_size: 100.0,
            decimal_precision: 2,
            output_path: PathBuf::from("output_data"),
            report_path: PathBuf::from("label_in_chunks.txt"),
        }
    }
}

impl RunConfig {
    /// Check option combinations that would fail every label
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("no input path given".into()));
        }
        if self.label_column == self.range_column {
            return Err(Error::InvalidArgument(format!(
                "label and range columns must differ, both are {}",
                self.label_column
            )));
        }
        if self.decimal_precision > MAX_PRECISION {
            return Err(Error::InvalidArgument(format!(
                "decimal precision {} exceeds {}",
                self.decimal_precision, MAX_PRECISION
            )));
        }
        self.slice_strategy()?;
        Ok(())
    }

    /// The slicing strategy for this run
    pub fn slice_strategy(&self) -> Result<SliceStrategy> {
        SliceStrategy::new(self.slice_policy, self.slice_size)
    }

    /// A binning engine for this run
    pub fn engine(&self) -> Result<BinningEngine> {
        Ok(BinningEngine::new(
            self.slice_strategy()?,
            self.aggregation,
            self.decimal_precision,
        ))
    }

    /// Output path with a `.csv` suffix
    pub fn output_file(&self) -> PathBuf {
        with_csv_suffix(&self.output_path)
    }

    /// Chunk size, when fixed by configuration
    pub fn fixed_chunk_size(&self) -> Option<usize> {
        (self.chunk_size > 0).then_some(self.chunk_size)
    }
}

fn with_csv_suffix(path: &Path) -> PathBuf {
    if path.to_string_lossy().ends_with(".csv") {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".csv");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.output_file(), PathBuf::from("output_data.csv"));
        assert_eq!(config.slice_strategy().unwrap(), SliceStrategy::Step(100));
        assert_eq!(config.fixed_chunk_size(), None);
        assert!(config.persist_chunks);
    }

    #[test]
    fn test_output_suffix_kept() {
        let config = RunConfig {
            output_path: PathBuf::from("out/binned.csv"),
            ..RunConfig::default()
        };
        assert_eq!(config.output_file(), PathBuf::from("out/binned.csv"));
    }

    #[test]
    fn test_validate() {
        let mut config = RunConfig {
            input: PathBuf::from("data.tsv"),
            ..RunConfig::default()
        };
        assert!(config.validate().is_ok());

        config.range_column = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        config.range_column = 1;
        config.slice_size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: RunConfig = serde_json::from_str(
            r#"{"input": "hybrid.depth", "aggregation": "ave", "slice_policy": "value", "slice_size": 0.15}"#,
        )
        .unwrap();

        assert_eq!(config.aggregation, Aggregation::Mean);
        assert_eq!(config.slice_strategy().unwrap(), SliceStrategy::Value(0.15));
        assert_eq!(config.decimal_precision, 2);
        assert_eq!(config.chunks_dir, PathBuf::from("CHUNKS"));
    }
}
