//! Pre-generation storage estimate.
//!
//! The estimate is the uncompressed width of an average row times the row
//! count. It is computed before anything is generated so the disk check can
//! run before a service is started, and reported next to the measured sizes
//! so estimate drift is visible.

use bench_core::{ColumnType, DatasetSpec, StringDomain, ValueRule};

/// Width assumed for a column whose rule does not match its declared type.
const FALLBACK_WIDTH: f64 = 8.0;

/// Average uncompressed bytes per row.
pub fn estimate_row_width(dataset: &DatasetSpec) -> f64 {
    dataset
        .columns
        .iter()
        .map(|column| column_width(&column.column_type, &column.rule))
        .sum()
}

/// Estimated uncompressed bytes for `row_count` rows of one table.
pub fn estimate_dataset_bytes(dataset: &DatasetSpec, row_count: u64) -> u64 {
    (estimate_row_width(dataset) * row_count as f64).ceil() as u64
}

fn column_width(column_type: &ColumnType, rule: &ValueRule) -> f64 {
    match (column_type, rule) {
        // Null map byte plus the nested value, which is stored for nulls too.
        (ColumnType::Nullable(ty), ValueRule::Nullable { inner, .. }) => 1.0 + column_width(ty, inner),
        // Offsets entry plus the mean element count.
        (
            ColumnType::Array(ty),
            ValueRule::Array {
                min_length,
                max_length,
                element,
            },
        ) => {
            let mean_length = (*min_length + *max_length) as f64 / 2.0;
            8.0 + mean_length * column_width(ty, element)
        }
        (ColumnType::LowCardinality(ty), ValueRule::LowCardinality { inner }) => {
            column_width(ty, inner)
        }
        (ColumnType::String, ValueRule::String { domain }) => 1.0 + mean_string_length(domain),
        (ty, _) => ty.fixed_width().map_or(FALLBACK_WIDTH, |w| w as f64),
    }
}

fn mean_string_length(domain: &StringDomain) -> f64 {
    match domain {
        StringDomain::Length { min, max } => (*min + *max) as f64 / 2.0,
        StringDomain::Values(values) if !values.is_empty() => {
            values.iter().map(|v| v.len()).sum::<usize>() as f64 / values.len() as f64
        }
        StringDomain::Values(_) => 0.0,
    }
}
