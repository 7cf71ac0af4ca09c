//! Containers left behind by runs that exited without teardown.

use crate::docker::{docker, MANAGED_LABEL};
use crate::error::EnvironmentError;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanContainer {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// List every container carrying the managed label, running or not.
pub fn find_orphans() -> Result<Vec<OrphanContainer>, EnvironmentError> {
    let filter = format!("label={MANAGED_LABEL}");
    let output = docker(&[
        "ps",
        "-a",
        "--filter",
        &filter,
        "--format",
        "{{.ID}}\t{{.Names}}\t{{.Status}}",
    ])?;
    Ok(parse_ps_output(&output))
}

/// Force-remove the given containers. Returns how many were removed;
/// individual failures are logged and skipped.
pub fn remove_orphans(orphans: &[OrphanContainer]) -> usize {
    let mut removed = 0;
    for orphan in orphans {
        match docker(&["rm", "-f", "-v", &orphan.id]) {
            Ok(_) => {
                info!("Removed orphaned container {} ({})", orphan.name, orphan.id);
                removed += 1;
            }
            Err(e) => warn!("Failed to remove container {}: {e}", orphan.id),
        }
    }
    removed
}

fn parse_ps_output(output: &str) -> Vec<OrphanContainer> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut fields = line.splitn(3, '\t');
            OrphanContainer {
                id: fields.next().unwrap_or_default().to_string(),
                name: fields.next().unwrap_or_default().to_string(),
                status: fields.next().unwrap_or_default().to_string(),
            }
        })
        .collect()
}
