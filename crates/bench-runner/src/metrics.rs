//! Per-run records and the metric catalogue.

use bench_core::ProfileCounters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a run's profile has been merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Measured, profile not yet collected.
    Pending,
    /// Measured and profiled; counts toward aggregation.
    Complete,
    /// The service never logged this run; excluded from aggregation.
    Incomplete,
}

/// One measured execution of a (query, schema) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub query: String,
    pub schema: String,
    pub table: String,
    /// Zero-based position among the pair's measured runs.
    pub sequence: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub wall_time_ms: f64,
    pub status: RunStatus,
    pub profile: Option<ProfileCounters>,
}

impl RunRecord {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }
}

/// Every metric aggregated per (query, schema) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    WallTimeMs,
    QueryDurationMs,
    ReadRows,
    ReadBytes,
    WrittenRows,
    WrittenBytes,
    ResultRows,
    ResultBytes,
    MemoryUsage,
    RealTimeUs,
    UserTimeUs,
    SystemTimeUs,
    OsReadBytes,
    OsWriteBytes,
    SelectedParts,
    SelectedMarks,
}

impl Metric {
    pub const ALL: [Metric; 16] = [
        Metric::WallTimeMs,
        Metric::QueryDurationMs,
        Metric::ReadRows,
        Metric::ReadBytes,
        Metric::WrittenRows,
        Metric::WrittenBytes,
        Metric::ResultRows,
        Metric::ResultBytes,
        Metric::MemoryUsage,
        Metric::RealTimeUs,
        Metric::UserTimeUs,
        Metric::SystemTimeUs,
        Metric::OsReadBytes,
        Metric::OsWriteBytes,
        Metric::SelectedParts,
        Metric::SelectedMarks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::WallTimeMs => "wall_time_ms",
            Metric::QueryDurationMs => "query_duration_ms",
            Metric::ReadRows => "read_rows",
            Metric::ReadBytes => "read_bytes",
            Metric::WrittenRows => "written_rows",
            Metric::WrittenBytes => "written_bytes",
            Metric::ResultRows => "result_rows",
            Metric::ResultBytes => "result_bytes",
            Metric::MemoryUsage => "memory_usage",
            Metric::RealTimeUs => "real_time_us",
            Metric::UserTimeUs => "user_time_us",
            Metric::SystemTimeUs => "system_time_us",
            Metric::OsReadBytes => "os_read_bytes",
            Metric::OsWriteBytes => "os_write_bytes",
            Metric::SelectedParts => "selected_parts",
            Metric::SelectedMarks => "selected_marks",
        }
    }

    /// Value of this metric for one run. Profile metrics are `None` until
    /// the profile has been merged.
    pub fn value(&self, record: &RunRecord) -> Option<f64> {
        let counter = |read: fn(&ProfileCounters) -> u64| {
            record.profile.as_ref().map(|p| read(p) as f64)
        };
        match self {
            Metric::WallTimeMs => Some(record.wall_time_ms),
            Metric::QueryDurationMs => counter(|p| p.query_duration_ms),
            Metric::ReadRows => counter(|p| p.read_rows),
            Metric::ReadBytes => counter(|p| p.read_bytes),
            Metric::WrittenRows => counter(|p| p.written_rows),
            Metric::WrittenBytes => counter(|p| p.written_bytes),
            Metric::ResultRows => counter(|p| p.result_rows),
            Metric::ResultBytes => counter(|p| p.result_bytes),
            Metric::MemoryUsage => counter(|p| p.memory_usage),
            Metric::RealTimeUs => counter(|p| p.real_time_us),
            Metric::UserTimeUs => counter(|p| p.user_time_us),
            Metric::SystemTimeUs => counter(|p| p.system_time_us),
            Metric::OsReadBytes => counter(|p| p.os_read_bytes),
            Metric::OsWriteBytes => counter(|p| p.os_write_bytes),
            Metric::SelectedParts => counter(|p| p.selected_parts),
            Metric::SelectedMarks => counter(|p| p.selected_marks),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
