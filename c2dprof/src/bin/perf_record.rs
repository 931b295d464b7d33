//! Profile miniC2D with `perf record` on every instance with a valid vtree log.
//!
//! Sampling is delayed until vtree construction is over, using the
//! `Vtree Time` reported in `vtree_logs/valid/<name>.log`. The folded,
//! demangled call-graph report ends up in `perf-report/<name>.log`.
//!
//! # Usage
//!
//! ```bash
//! perf_record
//! perf_record --use-vtree-input
//! ```

use c2dprof::cli::CommonArgs;
use c2dprof::config::{DEFAULT_VTREE_METHOD, RunConfig};
use c2dprof::process::TokioRunner;
use c2dprof::record::PerfRecordDriver;
use clap::Parser;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "perf_record")]
#[command(about = "Record perf call graphs of miniC2D runs")]
#[command(version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Use --vtree <file> instead of --vtree_method
    #[arg(long)]
    use_vtree_input: bool,

    /// Vtree construction method when no precomputed vtree is used
    #[arg(long, default_value_t = DEFAULT_VTREE_METHOD)]
    vtree_method: u32,
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let layout = args.common.layout()?;
    let config = RunConfig {
        timeout: args.common.timeout(),
        vtree_method: args.vtree_method,
        use_vtree_input: args.use_vtree_input,
        ..RunConfig::default()
    };

    PerfRecordDriver::new(&layout, &config, &TokioRunner).run().await?;
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
