//! Nearest-rank statistics over measured runs.

use crate::metrics::{Metric, RunRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one metric across the measured runs of one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl AggregatedMetric {
    /// Aggregate a set of observations. `None` when there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();
        Some(Self {
            count: n,
            min: sorted[0],
            max: sorted[n - 1],
            avg: sorted.iter().sum::<f64>() / n as f64,
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
        })
    }
}

/// Nearest-rank percentile of ascending `sorted`: the value at
/// `ceil(p * n) - 1`, clamped to the valid index range.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let rank = (p * n as f64).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    sorted[index]
}

/// Aggregate every metric over the complete runs of one pair. Metrics with
/// no observations are omitted.
pub fn aggregate_runs(records: &[RunRecord]) -> BTreeMap<Metric, AggregatedMetric> {
    let complete: Vec<&RunRecord> = records.iter().filter(|r| r.is_complete()).collect();
    Metric::ALL
        .iter()
        .filter_map(|metric| {
            let values: Vec<f64> = complete.iter().filter_map(|r| metric.value(r)).collect();
            AggregatedMetric::from_values(&values).map(|agg| (*metric, agg))
        })
        .collect()
}
