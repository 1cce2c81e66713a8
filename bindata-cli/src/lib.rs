//! Command line front end for bin-data runs
//!
//! [`run`] wires a [`RunConfig`] into a source, the binning pipeline, the
//! output writer, the chunk persister and the report file. [`CliArgs`] maps
//! command line flags (and an optional JSON config file) onto a config.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use tracing::{info, warn, Level};

use bindata_core::{Aggregation, Pipeline, RunConfig, RunSummary, SlicePolicy};
use bindata_readers::{
    load_label_list, write_report_file, ChunkSourceFactory, CsvBinWriter, CsvChunkPersister,
};

/// Bin labelled tabular data along a range column
#[derive(Parser, Debug)]
#[command(name = "bin-data")]
#[command(about = "Group a large delimited table by label and bin each label along a range column")]
#[command(after_help = "INPUT:\n  \
    A delimited file (delimiter and header are detected), or a directory of\n  \
    chunk_<label>.csv files saved by an earlier run.\n\n\
SLICING:\n  \
    step   fixed number of rows per bin\n  \
    bin    fixed number of bins per label\n  \
    value  fixed width along the range column")]
pub struct CliArgs {
    /// Input file or chunk directory
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// 0-based index of the label column
    #[arg(short, long)]
    pub label: Option<usize>,

    /// 0-based index of the range column
    #[arg(short, long)]
    pub range: Option<usize>,

    /// Labels to process: comma-separated, or a file with one label per line
    #[arg(long = "label-list", visible_alias = "ll")]
    pub label_list: Option<String>,

    /// Custom column names, comma-separated
    #[arg(short = 'H', long = "header", value_delimiter = ',')]
    pub header: Option<Vec<String>>,

    /// Rows per chunk (0 sizes chunks automatically)
    #[arg(short, long)]
    pub chunks: Option<usize>,

    /// Save each label's rows to the chunk directory
    #[arg(short, long, value_parser = BoolishValueParser::new())]
    pub save: Option<bool>,

    /// Aggregation: mean (ave) or sum
    #[arg(short = 'a', long = "calc", value_parser = parse_aggregation)]
    pub calc: Option<Aggregation>,

    /// Slicing: step, bin or value
    #[arg(short = 't', long = "type", value_parser = parse_policy)]
    pub slice_type: Option<SlicePolicy>,

    /// Rows per bin, bins per label, or bucket width
    #[arg(short = 'n', long = "slice")]
    pub slice: Option<f64>,

    /// Decimal places of aggregated values
    #[arg(short, long)]
    pub decimals: Option<u32>,

    /// Output file (`.csv` is appended when missing)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory for saved chunk files
    #[arg(long)]
    pub chunks_dir: Option<PathBuf>,

    /// Per-label report file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// JSON file with base options; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbosity: 0 warnings, 1 info, 2 debug (bare `-v` is 1)
    #[arg(short, long, default_value_t = 0, num_args = 0..=1, default_missing_value = "1")]
    pub verbose: u8,
}

fn parse_aggregation(s: &str) -> std::result::Result<Aggregation, String> {
    match s.to_ascii_lowercase().as_str() {
        "mean" | "ave" => Ok(Aggregation::Mean),
        "sum" => Ok(Aggregation::Sum),
        other => Err(format!("unknown aggregation '{other}', expected mean, ave or sum")),
    }
}

fn parse_policy(s: &str) -> std::result::Result<SlicePolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "step" => Ok(SlicePolicy::Step),
        "bin" => Ok(SlicePolicy::Bin),
        "value" => Ok(SlicePolicy::Value),
        other => Err(format!("unknown slicing '{other}', expected step, bin or value")),
    }
}

impl CliArgs {
    /// Resolve the run configuration: defaults, then the config file, then flags
    pub fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => RunConfig::default(),
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(label) = self.label {
            config.label_column = label;
        }
        if let Some(range) = self.range {
            config.range_column = range;
        }
        if let Some(label_list) = self.label_list {
            config.label_list = label_list;
        }
        if let Some(header) = self.header {
            config.column_names = Some(header);
        }
        if let Some(chunks) = self.chunks {
            config.chunk_size = chunks;
        }
        if let Some(save) = self.save {
            config.persist_chunks = save;
        }
        if let Some(calc) = self.calc {
            config.aggregation = calc;
        }
        if let Some(policy) = self.slice_type {
            config.slice_policy = policy;
        }
        if let Some(slice) = self.slice {
            config.slice_size = slice;
        }
        if let Some(decimals) = self.decimals {
            config.decimal_precision = decimals;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(dir) = self.chunks_dir {
            config.chunks_dir = dir;
        }
        if let Some(report) = self.report {
            config.report_path = report;
        }

        Ok(config)
    }
}

/// Install the fmt subscriber for `verbosity` (0 warn, 1 info, 2+ debug)
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    // A subscriber may already be installed by an embedding program.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Execute one binning run.
///
/// Schema, input and output errors abort the run. Labels that cannot be
/// binned or saved are reported in the returned summary and the log.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate().context("invalid configuration")?;

    let labels = load_label_list(&config.label_list).context("loading label list")?;
    let source = ChunkSourceFactory::from_config(config, labels.clone())
        .create()
        .with_context(|| format!("opening input {}", config.input.display()))?;

    let output = config.output_file();
    let sink = CsvBinWriter::new(&output, source.schema(), config.decimal_precision);
    let mut pipeline = Pipeline::new(source, config.engine()?, sink);
    if let Some(labels) = labels {
        pipeline = pipeline.with_allow_list(labels);
    }

    let outcome = if config.persist_chunks {
        pipeline
            .with_persister(CsvChunkPersister::new(&config.chunks_dir))
            .run()
    } else {
        pipeline.run()
    };
    let summary = outcome.context("binning failed")?;

    write_report_file(&config.report_path, &summary.diagnostics)
        .with_context(|| format!("writing report {}", config.report_path.display()))?;

    for failure in &summary.failures {
        warn!(label = %failure.label, rows = failure.rows, reason = %failure.reason, "label was not binned");
    }
    info!(
        output = %output.display(),
        labels = summary.diagnostics.len(),
        bins = summary.bins_emitted,
        "run complete"
    );
    Ok(summary)
}
