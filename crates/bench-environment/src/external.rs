//! An already-running ClickHouse server supplied by the user.

use crate::docker::wait_until_healthy;
use async_trait::async_trait;
use bench_clickhouse::{ClickHouseClient, ClickHouseConfig, ClickHouseService};
use bench_core::ServiceError;
use bench_runner::{ServiceInstance, ServiceLauncher};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Launcher for a server this tool does not own. Start only checks health;
/// teardown leaves the server running.
pub struct ExternalLauncher {
    config: ClickHouseConfig,
    health_timeout: Duration,
}

impl ExternalLauncher {
    pub fn new(config: ClickHouseConfig) -> Self {
        Self {
            config,
            health_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

#[async_trait]
impl ServiceLauncher for ExternalLauncher {
    async fn start(&self) -> Result<ServiceInstance, ServiceError> {
        let client = ClickHouseClient::new(self.config.clone())
            .map_err(|e| e.into_service_error("client setup"))?;
        wait_until_healthy(&client, self.health_timeout, Duration::from_millis(500)).await?;
        Ok(ServiceInstance {
            id: "external".to_string(),
            endpoint: self.config.endpoint.clone(),
            service: Arc::new(ClickHouseService::new(client)),
        })
    }

    fn teardown(&self, _instance_id: &str) -> Result<(), ServiceError> {
        info!(
            "Leaving external server at {} running",
            self.config.endpoint
        );
        Ok(())
    }

    fn outlives_run(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("external ClickHouse at {}", self.config.endpoint)
    }
}
