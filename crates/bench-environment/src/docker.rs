//! Docker-managed ClickHouse instances.

use crate::error::EnvironmentError;
use async_trait::async_trait;
use bench_clickhouse::{ClickHouseClient, ClickHouseConfig, ClickHouseService};
use bench_core::ServiceError;
use bench_runner::{ServiceInstance, ServiceLauncher};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Label carried by every container this tool starts.
pub const MANAGED_LABEL: &str = "schema-bench.managed=true";
/// Label key identifying the run a container belongs to.
pub const RUN_LABEL_KEY: &str = "schema-bench.run";
pub const DEFAULT_IMAGE: &str = "clickhouse/clickhouse-server:24.8";

const CONTAINER_HTTP_PORT: u16 = 8123;

/// Run the docker CLI and return its trimmed stdout.
pub(crate) fn docker(args: &[&str]) -> Result<String, EnvironmentError> {
    debug!("docker {}", args.join(" "));
    let output = Command::new("docker")
        .args(args)
        .stdin(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(EnvironmentError::Command {
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Poll `/ping` until the server answers or `timeout` elapses.
pub async fn wait_until_healthy(
    client: &ClickHouseClient,
    timeout: Duration,
    interval: Duration,
) -> Result<(), EnvironmentError> {
    let endpoint = &client.config().endpoint;
    info!("Waiting for ClickHouse at {endpoint} to become healthy...");
    let start = Instant::now();
    loop {
        match client.ping().await {
            Ok(true) => {
                info!("ClickHouse is ready after {:.1}s", start.elapsed().as_secs_f64());
                return Ok(());
            }
            Ok(false) => debug!("Ping answered but server is not ready"),
            Err(e) => debug!("Ping failed: {e}"),
        }
        if start.elapsed() >= timeout {
            return Err(EnvironmentError::Unhealthy {
                endpoint: endpoint.clone(),
                waited_secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval).await;
    }
}

#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub image: String,
    /// Host port mapped to the container's HTTP interface.
    pub host_port: u16,
    pub user: String,
    pub password: String,
    pub startup_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            host_port: 18123,
            user: "bench".to_string(),
            password: "bench".to_string(),
            startup_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Starts one labelled ClickHouse container per scenario.
pub struct DockerLauncher {
    config: DockerConfig,
}

impl DockerLauncher {
    pub fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.config.host_port)
    }

    fn run_args(&self, name: &str, run_id: &str) -> Vec<String> {
        let c = &self.config;
        vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            name.to_string(),
            "--label".to_string(),
            MANAGED_LABEL.to_string(),
            "--label".to_string(),
            format!("{RUN_LABEL_KEY}={run_id}"),
            "--ulimit".to_string(),
            "nofile=262144:262144".to_string(),
            "-e".to_string(),
            format!("CLICKHOUSE_USER={}", c.user),
            "-e".to_string(),
            format!("CLICKHOUSE_PASSWORD={}", c.password),
            "-e".to_string(),
            "CLICKHOUSE_DEFAULT_ACCESS_MANAGEMENT=1".to_string(),
            "-p".to_string(),
            format!("{}:{CONTAINER_HTTP_PORT}", c.host_port),
            c.image.clone(),
        ]
    }
}

#[async_trait]
impl ServiceLauncher for DockerLauncher {
    async fn start(&self) -> Result<ServiceInstance, ServiceError> {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("schema-bench-{}", &run_id[..12]);
        info!("Starting container {name} from {}", self.config.image);

        let args = self.run_args(&name, &run_id);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let container_id = docker(&arg_refs)?;
        info!("Started container: {container_id}");

        let endpoint = self.endpoint();
        let config = ClickHouseConfig::new(&endpoint)
            .with_credentials(&self.config.user, &self.config.password);
        let client = match ClickHouseClient::new(config) {
            Ok(client) => client,
            Err(e) => {
                self.teardown(&container_id)?;
                return Err(e.into_service_error("client setup"));
            }
        };

        if let Err(e) = wait_until_healthy(
            &client,
            self.config.startup_timeout,
            self.config.poll_interval,
        )
        .await
        {
            if let Err(teardown) = self.teardown(&container_id) {
                warn!("Failed to remove unhealthy container {container_id}: {teardown}");
            }
            return Err(e.into());
        }

        Ok(ServiceInstance {
            id: container_id,
            endpoint,
            service: Arc::new(ClickHouseService::new(client)),
        })
    }

    fn teardown(&self, instance_id: &str) -> Result<(), ServiceError> {
        info!("Removing container {instance_id}");
        docker(&["rm", "-f", "-v", instance_id])?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "docker {} on port {}",
            self.config.image, self.config.host_port
        )
    }
}
