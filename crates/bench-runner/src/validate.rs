//! Cross-schema result validation.

use bench_core::{QueryDef, ResultSet};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{info, warn};

/// One differing row position between two result sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDiff {
    pub position: usize,
    /// `None` when the left result has fewer rows.
    pub left: Option<Vec<String>>,
    pub right: Option<Vec<String>>,
}

/// Disagreement between two schemas on one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMismatch {
    pub left: String,
    pub right: String,
    pub left_rows: usize,
    pub right_rows: usize,
    pub row_count_delta: i64,
    /// First differing rows, bounded by the scenario's `max_diff_rows`.
    pub differing_rows: Vec<RowDiff>,
}

/// Validation result for one query across every schema that produced a
/// result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub query: String,
    pub matched: bool,
    /// Schemas whose results took part in the comparison.
    pub compared: Vec<String>,
    /// Schemas without a retained result (failed pair or schema).
    pub skipped: Vec<String>,
    pub mismatches: Vec<SchemaMismatch>,
}

/// Rows in comparison order: sorted by full row content unless the query
/// defines its own order.
pub fn canonicalize<'a>(query: &QueryDef, result: &'a ResultSet) -> Cow<'a, [Vec<String>]> {
    if query.ordered {
        Cow::Borrowed(&result.rows)
    } else {
        let mut rows = result.rows.clone();
        rows.sort();
        Cow::Owned(rows)
    }
}

/// Compare two canonical row sequences. `None` when they are equal.
pub fn compare_rows(
    left_name: &str,
    left: &[Vec<String>],
    right_name: &str,
    right: &[Vec<String>],
    max_diff_rows: usize,
) -> Option<SchemaMismatch> {
    if left == right {
        return None;
    }
    let longest = left.len().max(right.len());
    let differing_rows = (0..longest)
        .filter(|&i| left.get(i) != right.get(i))
        .take(max_diff_rows)
        .map(|i| RowDiff {
            position: i,
            left: left.get(i).cloned(),
            right: right.get(i).cloned(),
        })
        .collect();
    Some(SchemaMismatch {
        left: left_name.to_string(),
        right: right_name.to_string(),
        left_rows: left.len(),
        right_rows: right.len(),
        row_count_delta: right.len() as i64 - left.len() as i64,
        differing_rows,
    })
}

/// Compare every pair of retained results for one query.
///
/// `results` holds `(schema, result)` for schemas that produced one;
/// `skipped` names the schemas that did not.
pub fn validate_query(
    query: &QueryDef,
    results: &[(String, ResultSet)],
    skipped: Vec<String>,
    max_diff_rows: usize,
) -> ValidationOutcome {
    let canonical: Vec<(&str, Cow<'_, [Vec<String>]>)> = results
        .iter()
        .map(|(schema, result)| (schema.as_str(), canonicalize(query, result)))
        .collect();

    let mut mismatches = Vec::new();
    for (i, (left_name, left)) in canonical.iter().enumerate() {
        for (right_name, right) in &canonical[i + 1..] {
            if let Some(mismatch) = compare_rows(left_name, left, right_name, right, max_diff_rows)
            {
                warn!(
                    "Query {}: {} and {} disagree ({} vs {} rows)",
                    query.name, left_name, right_name, mismatch.left_rows, mismatch.right_rows
                );
                mismatches.push(mismatch);
            }
        }
    }

    if mismatches.is_empty() {
        info!(
            "Query {}: results match across {} schemas",
            query.name,
            canonical.len()
        );
    }

    ValidationOutcome {
        query: query.name.clone(),
        matched: mismatches.is_empty(),
        compared: results.iter().map(|(schema, _)| schema.clone()).collect(),
        skipped,
        mismatches,
    }
}
