//! Service lifecycle seams and the scoped instance guard.

use async_trait::async_trait;
use bench_core::{BenchService, ServiceError};
use std::sync::Arc;
use tracing::{error, info};

/// A running service instance, valid for one scenario.
#[derive(Clone)]
pub struct ServiceInstance {
    /// Launcher-specific handle (container id, endpoint, ...).
    pub id: String,
    pub endpoint: String,
    pub service: Arc<dyn BenchService>,
}

impl std::fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Starts and tears down service instances.
#[async_trait]
pub trait ServiceLauncher: Send + Sync {
    /// Start an instance and wait until it is healthy.
    async fn start(&self) -> Result<ServiceInstance, ServiceError>;

    /// Tear down an instance. Synchronous so it can run from `Drop`.
    fn teardown(&self, instance_id: &str) -> Result<(), ServiceError>;

    /// Human-readable description for logs and the environment snapshot.
    fn describe(&self) -> String;

    /// Whether the instance outlives teardown. Tables created on such an
    /// instance are dropped before release.
    fn outlives_run(&self) -> bool {
        false
    }
}

/// Free-space probe consulted before any service interaction.
pub trait DiskProbe: Send + Sync {
    fn available_bytes(&self) -> std::io::Result<u64>;

    /// Path or label the probe measures.
    fn location(&self) -> String;
}

/// Owns a started instance. Teardown happens exactly once: on [`release`]
/// or, if release never ran, on drop.
///
/// [`release`]: ServiceGuard::release
pub struct ServiceGuard {
    launcher: Arc<dyn ServiceLauncher>,
    instance: ServiceInstance,
    released: bool,
}

impl ServiceGuard {
    pub fn new(launcher: Arc<dyn ServiceLauncher>, instance: ServiceInstance) -> Self {
        Self {
            launcher,
            instance,
            released: false,
        }
    }

    pub fn instance(&self) -> &ServiceInstance {
        &self.instance
    }

    pub fn service(&self) -> Arc<dyn BenchService> {
        Arc::clone(&self.instance.service)
    }

    /// Tear the instance down now.
    pub fn release(mut self) -> Result<(), ServiceError> {
        self.released = true;
        info!("Tearing down service instance {}", self.instance.id);
        self.launcher.teardown(&self.instance.id)
    }
}

impl Drop for ServiceGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        info!(
            "Tearing down service instance {} on unwind",
            self.instance.id
        );
        if let Err(e) = self.launcher.teardown(&self.instance.id) {
            error!("Teardown of {} failed: {e}", self.instance.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLauncher, FakeService};

    #[tokio::test]
    async fn test_release_tears_down_once() {
        let launcher = Arc::new(FakeLauncher::new(FakeService::new()));
        let instance = launcher.start().await.unwrap();
        let guard = ServiceGuard::new(launcher.clone(), instance);
        guard.release().unwrap();
        assert_eq!(launcher.teardowns(), 1);
    }

    #[tokio::test]
    async fn test_drop_tears_down_once() {
        let launcher = Arc::new(FakeLauncher::new(FakeService::new()));
        let instance = launcher.start().await.unwrap();
        {
            let _guard = ServiceGuard::new(launcher.clone(), instance);
        }
        assert_eq!(launcher.teardowns(), 1);
    }

    #[tokio::test]
    async fn test_failed_release_is_not_retried_on_drop() {
        let launcher = Arc::new(FakeLauncher::new(FakeService::new()).failing_teardown());
        let instance = launcher.start().await.unwrap();
        let guard = ServiceGuard::new(launcher.clone(), instance);
        assert!(guard.release().is_err());
        assert_eq!(launcher.teardowns(), 1);
    }
}
