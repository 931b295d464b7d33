//! Profile every pending CNF instance and store per-function percentages.
//!
//! For each instance without `function_percents/<name>.json`, runs
//! `perf.sh <cnf> stdouts/ perf_results/`, aggregates the resulting
//! `perf_results/<name>-perf.log` and writes the JSON file.
//!
//! # Usage
//!
//! ```bash
//! fn_percents
//! fn_percents --mode self-time --total-time
//! fn_percents --mode call-graph --tags ctags.txt
//! ```

use c2dprof::cli::{CommonArgs, Duplicates, Mode};
use c2dprof::config::RunConfig;
use c2dprof::functions::FunctionPercentsDriver;
use c2dprof::process::TokioRunner;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "fn_percents")]
#[command(about = "Compute per-function runtime percentages of miniC2D runs")]
#[command(version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Report shape produced by the profiling script
    #[arg(short, long, value_enum, default_value = "call-graph")]
    mode: Mode,

    /// Tag list of tracked functions (defaults to <root>/ctags.txt)
    #[arg(short, long)]
    tags: Option<PathBuf>,

    /// Profiling script (defaults to <root>/perf.sh)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Shared object name of the compiler in the report
    #[arg(short, long, default_value = "miniC2D")]
    binary: String,

    /// How to combine repeated symbols in self-time mode
    #[arg(long, value_enum, default_value = "overwrite")]
    duplicates: Duplicates,

    /// Store the run's "Total Time" under _total_time
    #[arg(long)]
    total_time: bool,
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut layout = args.common.layout()?;
    if let Some(tags) = args.tags {
        layout.tags_file = layout.root.join(tags);
    }
    if let Some(script) = args.script {
        layout.perf_script = layout.root.join(script);
    }

    let config = RunConfig {
        timeout: args.common.timeout(),
        mode: args.mode.into(),
        duplicates: args.duplicates.into(),
        record_total_time: args.total_time,
        target_binary: args.binary,
        ..RunConfig::default()
    };

    FunctionPercentsDriver::new(&layout, &config, &TokioRunner)
        .run()
        .await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    c2dprof::logging::init(args.common.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
