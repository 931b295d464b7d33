//! Generate a vtree for every CNF instance of a benchmark directory.
//!
//! Runs `miniC2D --cnf <cnf> --vtree_out vtree/<name>.vtree --vtree_method <m>`
//! for each instance that has no vtree yet, logging the compiler's output to
//! `vtree_logs/<name>.log`.
//!
//! # Usage
//!
//! ```bash
//! gen_vtrees
//! gen_vtrees --root /data/benchmarks --vtree-method 4 --timeout-secs 3600
//! ```

use c2dprof::cli::CommonArgs;
use c2dprof::config::{DEFAULT_VTREE_METHOD, RunConfig};
use c2dprof::process::TokioRunner;
use c2dprof::vtree::VtreeDriver;
use clap::Parser;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "gen_vtrees")]
#[command(about = "Generate vtrees for a directory of CNF files")]
#[command(version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Vtree construction method passed to miniC2D
    #[arg(long, default_value_t = DEFAULT_VTREE_METHOD)]
    vtree_method: u32,
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let layout = args.common.layout()?;
    let config = RunConfig {
        timeout: args.common.timeout(),
        vtree_method: args.vtree_method,
        ..RunConfig::default()
    };

    VtreeDriver::new(&layout, &config, &TokioRunner).run().await?;
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
