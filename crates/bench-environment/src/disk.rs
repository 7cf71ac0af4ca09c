//! Free-space probe backed by `statvfs`.

use crate::docker::docker;
use bench_runner::DiskProbe;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_DOCKER_ROOT: &str = "/var/lib/docker";

/// Reports space available to unprivileged writers on the filesystem
/// holding `path`.
#[derive(Debug, Clone)]
pub struct StatvfsProbe {
    path: PathBuf,
}

impl StatvfsProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Probe docker's data root, where container volumes live. Falls back to
    /// the conventional location, then to `/`.
    pub fn docker_root() -> Self {
        let root = docker(&["info", "--format", "{{.DockerRootDir}}"])
            .ok()
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCKER_ROOT.to_string());
        let path = if Path::new(&root).exists() {
            PathBuf::from(root)
        } else {
            debug!("Docker root {root} not visible, probing /");
            PathBuf::from("/")
        };
        Self::new(path)
    }
}

impl DiskProbe for StatvfsProbe {
    fn available_bytes(&self) -> io::Result<u64> {
        let stat = nix::sys::statvfs::statvfs(self.path.as_path()).map_err(io::Error::from)?;
        Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
