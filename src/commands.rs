//! Command handlers.

use crate::export::DirectoryExporter;
use anyhow::Context;
use bench_clickhouse::ClickHouseConfig;
use bench_core::{BenchConfig, ConfigError, ScenarioSpec};
use bench_environment::{
    capture_host_info, find_orphans, remove_orphans, DockerConfig, DockerLauncher,
    ExternalLauncher, StatvfsProbe, DEFAULT_IMAGE,
};
use bench_generator::{estimate_dataset_bytes, estimate_row_width};
use bench_runner::{BenchError, DiskProbe, Orchestrator, ServiceLauncher, TerminalStatus};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Benchmark configuration file (YAML)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Scenario to run
    #[arg(long)]
    pub scenario: String,

    /// Directory that receives one result directory per run
    #[arg(long, default_value = "results")]
    pub output_dir: PathBuf,

    /// ClickHouse server image
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Host port mapped to the container's HTTP interface
    #[arg(long, default_value_t = 18123)]
    pub port: u16,

    /// Benchmark an already-running server instead of starting a container
    #[arg(long, env = "SCHEMA_BENCH_ENDPOINT")]
    pub endpoint: Option<String>,

    /// ClickHouse user
    #[arg(long, env = "SCHEMA_BENCH_USER", default_value = "bench")]
    pub user: String,

    /// ClickHouse password
    #[arg(long, env = "SCHEMA_BENCH_PASSWORD", default_value = "bench")]
    pub password: String,

    /// Path whose filesystem is checked for free space (defaults to docker's data root)
    #[arg(long, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Override the scenario's concurrent insert worker count
    #[arg(long)]
    pub insert_workers: Option<usize>,

    /// Seconds to wait for a started container to become healthy
    #[arg(long, default_value_t = 120)]
    pub startup_timeout: u64,

    /// Remove containers left behind by earlier runs before starting
    #[arg(long)]
    pub remove_orphans: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Benchmark configuration file (YAML)
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Only check this scenario
    #[arg(long)]
    pub scenario: Option<String>,
}

/// Run one scenario end to end.
pub async fn run_scenario(
    args: RunArgs,
    cancel: CancellationToken,
) -> anyhow::Result<TerminalStatus> {
    let mut scenario = match load_scenario(&args) {
        Ok(scenario) => scenario,
        Err(e) => {
            let e = BenchError::from(e);
            error!("Configuration {:?}: {e}", args.config);
            return Ok(e.status());
        }
    };
    if let Some(workers) = args.insert_workers {
        if workers == 0 {
            error!("--insert-workers must be at least 1");
            return Ok(TerminalStatus::ConfigurationError);
        }
        scenario.params.insert_workers = workers;
    }

    let (launcher, disk): (Arc<dyn ServiceLauncher>, Arc<dyn DiskProbe>) = match &args.endpoint {
        Some(endpoint) => {
            let config = ClickHouseConfig::new(endpoint).with_credentials(&args.user, &args.password);
            let probe = StatvfsProbe::new(args.data_dir.clone().unwrap_or_else(|| PathBuf::from(".")));
            (Arc::new(ExternalLauncher::new(config)), Arc::new(probe))
        }
        None => {
            reconcile_orphans(args.remove_orphans);
            let launcher = DockerLauncher::new(DockerConfig {
                image: args.image.clone(),
                host_port: args.port,
                user: args.user.clone(),
                password: args.password.clone(),
                startup_timeout: Duration::from_secs(args.startup_timeout),
                ..DockerConfig::default()
            });
            let probe = match &args.data_dir {
                Some(dir) => StatvfsProbe::new(dir),
                None => StatvfsProbe::docker_root(),
            };
            (Arc::new(launcher), Arc::new(probe))
        }
    };

    let exporter = DirectoryExporter::new(&args.output_dir, capture_host_info());
    let orchestrator =
        Orchestrator::new(launcher, disk, Arc::new(exporter)).with_cancellation(cancel);
    let outcome = orchestrator.run(&scenario).await;

    if let Some(report) = &outcome.report {
        println!("{}", report.summary());
    }
    if let Some(path) = &outcome.artifacts {
        info!("Artifacts written to {}", path.display());
    }
    if let Some(e) = &outcome.error {
        error!("{e}");
    }
    Ok(outcome.status)
}

fn load_scenario(args: &RunArgs) -> Result<ScenarioSpec, ConfigError> {
    let config = BenchConfig::from_file(&args.config)?;
    Ok(config.scenario(&args.scenario)?.clone())
}

/// Warn about, or remove, containers a crashed run left behind.
fn reconcile_orphans(remove: bool) {
    let orphans = match find_orphans() {
        Ok(orphans) => orphans,
        Err(e) => {
            warn!("Could not check for orphaned containers: {e}");
            return;
        }
    };
    if orphans.is_empty() {
        return;
    }
    if remove {
        let removed = remove_orphans(&orphans);
        info!("Removed {removed} of {} orphaned containers", orphans.len());
    } else {
        for orphan in &orphans {
            warn!(
                "Orphaned container from an earlier run: {} ({}, {})",
                orphan.name, orphan.id, orphan.status
            );
        }
        warn!("Pass --remove-orphans or run `schema-bench cleanup` to remove them");
    }
}

/// Resolve the configuration and print size estimates without touching any
/// service.
pub fn check(args: CheckArgs) -> anyhow::Result<TerminalStatus> {
    let config = match BenchConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration {:?} is invalid: {e}", args.config);
            return Ok(TerminalStatus::ConfigurationError);
        }
    };
    let scenarios: Vec<&ScenarioSpec> = match &args.scenario {
        Some(name) => match config.scenario(name) {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                error!("{e}");
                return Ok(TerminalStatus::ConfigurationError);
            }
        },
        None => config.scenarios.iter().collect(),
    };

    for scenario in scenarios {
        println!("{}", describe_scenario(scenario));
    }
    Ok(TerminalStatus::Success)
}

fn describe_scenario(scenario: &ScenarioSpec) -> String {
    let params = &scenario.params;
    let per_schema = estimate_dataset_bytes(&scenario.dataset, params.row_count);
    let total = per_schema.saturating_mul(scenario.schemas.len() as u64);
    format!(
        "Scenario {}\n  dataset: {} ({} columns, ~{:.1} bytes/row)\n  schemas: {}\n  queries: {}\n  rows: {} in {} batches of {}\n  runs: {} warm-up + {} measured\n  estimated size: {} per schema, {} total",
        scenario.name,
        scenario.dataset.name,
        scenario.dataset.columns.len(),
        estimate_row_width(&scenario.dataset),
        scenario
            .schemas
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        scenario
            .queries
            .iter()
            .map(|q| q.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        params.row_count,
        params.batch_count(),
        params.batch_size,
        params.warmup_runs,
        params.measured_runs,
        format_bytes(per_schema),
        format_bytes(total),
    )
}

/// Remove every container carrying the managed label.
pub fn cleanup() -> anyhow::Result<TerminalStatus> {
    let orphans = find_orphans().context("Failed to list managed containers")?;
    if orphans.is_empty() {
        println!("No orphaned containers found");
        return Ok(TerminalStatus::Success);
    }
    let removed = remove_orphans(&orphans);
    println!("Removed {removed} of {} orphaned containers", orphans.len());
    if removed < orphans.len() {
        return Ok(TerminalStatus::EnvironmentError);
    }
    Ok(TerminalStatus::Success)
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
