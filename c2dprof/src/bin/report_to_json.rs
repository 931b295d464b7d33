//! Convert a single perf report to a function-percentage JSON file.
//!
//! No external process is run; this is the aggregation step of `fn_percents`
//! on its own, for reports collected elsewhere.
//!
//! # Usage
//!
//! ```bash
//! report_to_json perf_results/foo.cnf-perf.log -o foo.json --tags ctags.txt
//! report_to_json perf.txt --mode self-time --stdout-log stdouts/foo.cnf.log
//! report_to_json perf.txt  # outputs to perf.json
//! ```

use c2dprof::cli::{Duplicates, Mode};
use c2dprof::config::RunConfig;
use c2dprof::functions::{Aggregator, write_percents};
use c2dprof_parse::{TOTAL_TIME_KEY, parse_total_time};
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "report_to_json")]
#[command(about = "Aggregate a perf report into per-function percentages")]
#[command(version)]
struct Args {
    /// perf report text output
    input: PathBuf,

    /// Output JSON file (defaults to input filename with .json extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report shape
    #[arg(short, long, value_enum, default_value = "call-graph")]
    mode: Mode,

    /// Tag list of tracked functions, for call-graph mode
    #[arg(short, long, default_value = "ctags.txt")]
    tags: PathBuf,

    /// Shared object name of the compiler, for self-time mode
    #[arg(short, long, default_value = "miniC2D")]
    binary: String,

    /// How to combine repeated symbols in self-time mode
    #[arg(long, value_enum, default_value = "overwrite")]
    duplicates: Duplicates,

    /// miniC2D console log to take "Total Time" from
    #[arg(long)]
    stdout_log: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Determine output path
    let output_path = args.output.unwrap_or_else(|| {
        let mut path = args.input.clone();
        path.set_extension("json");
        path
    });

    let config = RunConfig {
        mode: args.mode.into(),
        duplicates: args.duplicates.into(),
        target_binary: args.binary,
        ..RunConfig::default()
    };
    let aggregator = Aggregator::load(&config, &args.tags)?;
    let mut percents = aggregator.aggregate_file(&args.input)?;

    if let Some(log) = &args.stdout_log {
        let file = File::open(log)
            .map_err(|e| format!("Failed to open stdout log '{}': {}", log.display(), e))?;
        percents.insert(TOTAL_TIME_KEY, parse_total_time(file)?);
    }

    write_percents(&percents, &output_path)?;

    tracing::info!(
        "Converted '{}' -> '{}' ({} functions, {:.2}% total)",
        args.input.display(),
        output_path.display(),
        percents.len(),
        percents
            .iter()
            .filter(|(name, _)| *name != TOTAL_TIME_KEY)
            .map(|(_, pct)| pct)
            .sum::<f64>()
    );

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    c2dprof::logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
