//! `bin-data` command line entry point

use anyhow::Result;
use clap::Parser;

use bindata_cli::{init_logging, run, CliArgs};

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let config = args.into_config()?;
    let summary = run(&config)?;

    if !summary.is_clean() {
        eprintln!(
            "{} of {} label groups could not be binned, see the log for details",
            summary.failures.len(),
            summary.groups_flushed
        );
    }
    Ok(())
}
