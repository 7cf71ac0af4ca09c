//! Command-line interface for schema-bench
//!
//! # Usage Examples
//!
//! ```bash
//! # Validate a configuration without starting anything
//! schema-bench check --config bench.yaml
//!
//! # Run a scenario; results land in results/<scenario>_<timestamp>/
//! schema-bench run --config bench.yaml --scenario events_by_time \
//!   --output-dir results --remove-orphans
//!
//! # Remove containers left behind by an interrupted run
//! schema-bench cleanup
//! ```
//!
//! ## Exit Codes
//! - 0: success
//! - 2: configuration error
//! - 3: validation mismatch between schemas
//! - 4: environment error (service, docker, export)
//! - 5: insufficient disk space
//! - 130: interrupted

use clap::{Parser, Subcommand};
use schema_bench::{CheckArgs, RunArgs};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-bench")]
#[command(about = "Benchmark ClickHouse table designs against one identical dataset")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario end to end
    Run(RunArgs),

    /// Resolve a configuration and print size estimates
    Check(CheckArgs),

    /// Remove containers left behind by earlier runs
    Cleanup,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => {
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Received interrupt signal (Ctrl+C), stopping at the next boundary");
                    token.cancel();
                }
            });
            schema_bench::run_scenario(args, cancel).await
        }
        Commands::Check(args) => schema_bench::check(args),
        Commands::Cleanup => schema_bench::cleanup(),
    };

    let code = match result {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };
    std::process::exit(code);
}
