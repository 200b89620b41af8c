//! matvec CLI
//!
//! Drives the differential harness from the command line.
//!
//! ```text
//! matvec run --rows 64 --cols 64 --generator seeded:42
//! matvec run --rows 9 --cols 8 --transposed --json
//! matvec sweep --sizes 8,16,64,256 --no-oracle
//! matvec dump --rows 8 --cols 8
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

mod commands;
mod exit;

use commands::{DumpCommand, RunCommand, SweepCommand};
use exit::{EXIT_ERROR, EXIT_PARITY_FAIL, EXIT_SUCCESS};

/// Differential testing for dense f32 matrix-vector kernels
#[derive(Parser, Debug)]
#[command(name = "matvec", version, about)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL", global = true, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one trial and report every comparison
    Run(RunCommand),

    /// Run square trials over a list of sizes
    Sweep(SweepCommand),

    /// Print generated buffers and kernel outputs
    Dump(DumpCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli.log_level, cli.log_format) {
        eprintln!("failed to initialise logging: {e}");
    }

    let result = match &cli.command {
        Commands::Run(cmd) => cmd.execute(),
        Commands::Sweep(cmd) => cmd.execute(),
        Commands::Dump(cmd) => cmd.execute(),
    };

    let code = match result {
        Ok(true) => EXIT_SUCCESS,
        Ok(false) => EXIT_PARITY_FAIL,
        Err(e) => {
            error!("Command failed: {e}");
            let mut source = e.source();
            while let Some(err) = source {
                error!("  Caused by: {err}");
                source = err.source();
            }
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn setup_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber
            .json()
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?,
        LogFormat::Compact => subscriber.compact().try_init().map_err(|e| anyhow::anyhow!(e))?,
        LogFormat::Pretty => subscriber.pretty().try_init().map_err(|e| anyhow::anyhow!(e))?,
    }

    Ok(())
}
