//! Host snapshot recorded next to every scenario report.

use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostInfo {
    pub hostname: String,
    pub cpu_cores: usize,
    pub total_memory_mb: u64,
    pub available_memory_mb: u64,
    pub os: Option<String>,
}

/// Capture and log the machine the benchmark ran on.
pub fn capture_host_info() -> HostInfo {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let cpu_cores = num_cpus::get();

    let sys = sysinfo::System::new_all();
    let total_memory_mb = sys.total_memory() / 1024 / 1024;
    let available_memory_mb = sys.available_memory() / 1024 / 1024;

    info!(
        "Host {hostname}: {cpu_cores} cores, {available_memory_mb}/{total_memory_mb} MB memory available"
    );

    HostInfo {
        hostname,
        cpu_cores,
        total_memory_mb,
        available_memory_mb,
        os: sysinfo::System::long_os_version(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_host_info() {
        let info = capture_host_info();
        assert!(info.cpu_cores >= 1);
        assert!(!info.hostname.is_empty());
        assert!(info.available_memory_mb <= info.total_memory_mb);
    }
}
