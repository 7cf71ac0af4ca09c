//! YAML configuration loading and resolution.
//!
//! A configuration file declares `datasets`, `schemas`, `queries` and
//! `scenarios`. Loading parses the raw YAML, then resolves every definition
//! into the immutable forms in [`crate::spec`]. Every malformed definition
//! is reported here, before any service is contacted.
//!
//! ```yaml
//! datasets:
//!   - name: events
//!     columns:
//!       - name: user_id
//!         type: UInt32
//!         range: [1, 100000]
//!       - name: country
//!         type: LowCardinality(String)
//!         values: [US, DE, FR]
//!       - name: referrer
//!         type: Nullable(String)
//!         null_probability: 0.3
//!         range: [5, 20]
//!       - name: tags
//!         type: Array(String)
//!         range: [0, 4]
//!         element:
//!           values: [red, green, blue]
//! schemas:
//!   - name: by_user
//!     order_by: [user_id]
//!   - name: by_country
//!     order_by: [country, user_id]
//! queries:
//!   - name: per_country
//!     sql: "SELECT country, count() FROM {table} GROUP BY country"
//! scenarios:
//!   - name: ordering
//!     dataset: events
//!     schemas: [by_user, by_country]
//!     queries: [per_country]
//!     benchmark:
//!       row_count: 1000000
//! ```

use crate::spec::{
    BenchmarkParams, ColumnSpec, DatasetSpec, Domain, PostCreateScript, QueryDef, ScenarioSpec,
    SchemaDef, StringDomain, ValueRule, TABLE_PLACEHOLDER,
};
use crate::types::ColumnType;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading a configuration or script file
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Two definitions of the same kind share a name
    #[error("Duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    /// A scenario references a definition that does not exist
    #[error("Scenario '{scenario}' references unknown {kind} '{name}'")]
    UnknownReference {
        scenario: String,
        kind: &'static str,
        name: String,
    },

    /// Column definition is malformed
    #[error("Column '{dataset}.{column}': {message}")]
    InvalidColumn {
        dataset: String,
        column: String,
        message: String,
    },

    /// Schema definition is malformed
    #[error("Schema '{schema}': {message}")]
    InvalidSchema { schema: String, message: String },

    /// Query definition is malformed
    #[error("Query '{query}': {message}")]
    InvalidQuery { query: String, message: String },

    /// Scenario definition is malformed
    #[error("Scenario '{scenario}': {message}")]
    InvalidScenario { scenario: String, message: String },

    /// Requested scenario is not declared
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),
}

// ============================================================================
// Raw (as written) definitions
// ============================================================================

/// Configuration file as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)]
    pub datasets: Vec<RawDataset>,
    #[serde(default)]
    pub schemas: Vec<RawSchema>,
    #[serde(default)]
    pub queries: Vec<RawQuery>,
    #[serde(default)]
    pub scenarios: Vec<RawScenario>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDataset {
    pub name: String,
    pub columns: Vec<RawColumn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(flatten)]
    pub rule: RawRule,
}

/// Value domain as written. Applies to the innermost non-wrapper type, except
/// that for arrays `range` bounds the length and `element` holds the element
/// rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRule {
    #[serde(default)]
    pub range: Option<Vec<YamlValue>>,
    #[serde(default)]
    pub values: Option<Vec<YamlValue>>,
    #[serde(default)]
    pub null_probability: Option<f64>,
    #[serde(default)]
    pub element: Option<Box<RawRule>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchema {
    pub name: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default)]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub partition_by: Option<String>,
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub settings: BTreeMap<String, YamlValue>,
    #[serde(default)]
    pub post_create: Vec<PathBuf>,
}

fn default_engine() -> String {
    "MergeTree".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawQuery {
    pub name: String,
    pub sql: String,
    #[serde(default)]
    pub ordered: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawScenario {
    pub name: String,
    pub dataset: String,
    pub schemas: Vec<String>,
    pub queries: Vec<String>,
    pub benchmark: RawBenchmark,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBenchmark {
    pub row_count: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_warmup_runs")]
    pub warmup_runs: u32,
    #[serde(default = "default_measured_runs")]
    pub measured_runs: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_insert_workers")]
    pub insert_workers: usize,
    #[serde(default = "default_max_diff_rows")]
    pub max_diff_rows: usize,
}

fn default_batch_size() -> usize {
    10_000
}

fn default_warmup_runs() -> u32 {
    1
}

fn default_measured_runs() -> u32 {
    5
}

fn default_seed() -> u64 {
    42
}

fn default_insert_workers() -> usize {
    4
}

fn default_max_diff_rows() -> usize {
    5
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// All scenarios of one configuration file, fully resolved.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub scenarios: Vec<ScenarioSpec>,
}

impl BenchConfig {
    /// Load and resolve a configuration file. Script paths resolve relative
    /// to the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base_dir)
    }

    /// Parse and resolve configuration text.
    pub fn from_yaml(yaml: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        resolve(&raw, base_dir)
    }

    /// Get a scenario by name.
    pub fn scenario(&self, name: &str) -> Result<&ScenarioSpec, ConfigError> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::ScenarioNotFound(name.to_string()))
    }

    /// Get all scenario names.
    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Resolve every definition in a raw configuration.
pub fn resolve(raw: &RawConfig, base_dir: &Path) -> Result<BenchConfig, ConfigError> {
    let datasets = index_unique("dataset", &raw.datasets, |d| &d.name)?;
    let schemas = index_unique("schema", &raw.schemas, |s| &s.name)?;
    let queries = index_unique("query", &raw.queries, |q| &q.name)?;
    index_unique("scenario", &raw.scenarios, |s| &s.name)?;

    let resolved_datasets: HashMap<&str, DatasetSpec> = datasets
        .iter()
        .map(|(name, raw)| resolve_dataset(raw).map(|d| (*name, d)))
        .collect::<Result<_, _>>()?;
    let resolved_schemas: HashMap<&str, SchemaDef> = schemas
        .iter()
        .map(|(name, raw)| resolve_schema(raw, base_dir).map(|s| (*name, s)))
        .collect::<Result<_, _>>()?;
    let resolved_queries: HashMap<&str, QueryDef> = queries
        .iter()
        .map(|(name, raw)| resolve_query(raw).map(|q| (*name, q)))
        .collect::<Result<_, _>>()?;

    let scenarios = raw
        .scenarios
        .iter()
        .map(|scenario| {
            resolve_scenario(
                scenario,
                &resolved_datasets,
                &resolved_schemas,
                &resolved_queries,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BenchConfig { scenarios })
}

fn index_unique<'a, T>(
    kind: &'static str,
    items: &'a [T],
    name: impl Fn(&'a T) -> &'a String,
) -> Result<HashMap<&'a str, &'a T>, ConfigError> {
    let mut map = HashMap::new();
    for item in items {
        let key = name(item).as_str();
        if map.insert(key, item).is_some() {
            return Err(ConfigError::Duplicate {
                kind,
                name: key.to_string(),
            });
        }
    }
    Ok(map)
}

fn resolve_scenario(
    raw: &RawScenario,
    datasets: &HashMap<&str, DatasetSpec>,
    schemas: &HashMap<&str, SchemaDef>,
    queries: &HashMap<&str, QueryDef>,
) -> Result<ScenarioSpec, ConfigError> {
    let unknown = |kind: &'static str, name: &str| ConfigError::UnknownReference {
        scenario: raw.name.clone(),
        kind,
        name: name.to_string(),
    };
    let invalid = |message: String| ConfigError::InvalidScenario {
        scenario: raw.name.clone(),
        message,
    };

    let dataset = datasets
        .get(raw.dataset.as_str())
        .cloned()
        .ok_or_else(|| unknown("dataset", &raw.dataset))?;

    if raw.schemas.len() < 2 {
        return Err(invalid(format!(
            "at least two schemas are required for a comparison, got {}",
            raw.schemas.len()
        )));
    }
    let mut seen = HashSet::new();
    let mut scenario_schemas = Vec::with_capacity(raw.schemas.len());
    for name in &raw.schemas {
        if !seen.insert(name.as_str()) {
            return Err(invalid(format!("schema '{name}' is listed twice")));
        }
        let schema = schemas
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| unknown("schema", name))?;
        scenario_schemas.push(schema);
    }

    if raw.queries.is_empty() {
        return Err(invalid("at least one query is required".to_string()));
    }
    let scenario_queries = raw
        .queries
        .iter()
        .map(|name| {
            queries
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| unknown("query", name))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let bench = &raw.benchmark;
    if bench.row_count == 0 {
        return Err(invalid("row_count must be positive".to_string()));
    }
    if bench.batch_size == 0 {
        return Err(invalid("batch_size must be positive".to_string()));
    }
    if bench.measured_runs == 0 {
        return Err(invalid("measured_runs must be positive".to_string()));
    }
    if bench.insert_workers == 0 {
        return Err(invalid("insert_workers must be positive".to_string()));
    }

    Ok(ScenarioSpec {
        name: raw.name.clone(),
        dataset,
        schemas: scenario_schemas,
        queries: scenario_queries,
        params: BenchmarkParams {
            row_count: bench.row_count,
            batch_size: bench.batch_size,
            warmup_runs: bench.warmup_runs,
            measured_runs: bench.measured_runs,
            seed: bench.seed,
            insert_workers: bench.insert_workers,
            max_diff_rows: bench.max_diff_rows,
        },
    })
}

fn resolve_schema(raw: &RawSchema, base_dir: &Path) -> Result<SchemaDef, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidSchema {
        schema: raw.name.clone(),
        message,
    };
    if raw.engine.trim().is_empty() {
        return Err(invalid("engine must not be empty".to_string()));
    }

    let settings = raw
        .settings
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                YamlValue::Number(n) => n.to_string(),
                YamlValue::Bool(b) => u8::from(*b).to_string(),
                YamlValue::String(s) => format!("'{}'", s.replace('\'', "\\'")),
                other => return Err(invalid(format!("setting '{key}' has unsupported value {other:?}"))),
            };
            Ok((key.clone(), rendered))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let post_create = raw
        .post_create
        .iter()
        .map(|relative| {
            let path = base_dir.join(relative);
            let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let statements = split_statements(&text);
            if statements.is_empty() {
                return Err(invalid(format!("post-create script {path:?} is empty")));
            }
            Ok(PostCreateScript { path, statements })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SchemaDef {
        name: raw.name.clone(),
        engine: raw.engine.clone(),
        order_by: raw.order_by.clone(),
        partition_by: raw.partition_by.clone(),
        primary_key: raw.primary_key.clone(),
        settings,
        post_create,
    })
}

/// Split script text into statements on `;`, dropping blank statements and
/// `--` comment lines.
pub fn split_statements(text: &str) -> Vec<String> {
    let without_comments: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    without_comments
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn resolve_query(raw: &RawQuery) -> Result<QueryDef, ConfigError> {
    if !raw.sql.contains(TABLE_PLACEHOLDER) {
        return Err(ConfigError::InvalidQuery {
            query: raw.name.clone(),
            message: format!("sql must reference the table as {TABLE_PLACEHOLDER}"),
        });
    }
    let ordered = raw.ordered.unwrap_or_else(|| has_top_level_order_by(&raw.sql));
    Ok(QueryDef {
        name: raw.name.clone(),
        template: raw.sql.trim().to_string(),
        ordered,
    })
}

/// Detect an `ORDER BY` outside any parentheses.
pub fn has_top_level_order_by(sql: &str) -> bool {
    let upper = sql.to_ascii_uppercase();
    let mut depth = 0i32;
    let mut top_level = String::with_capacity(upper.len());
    for c in upper.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 => top_level.push(c),
            _ => {}
        }
    }
    let words: Vec<&str> = top_level.split_whitespace().collect();
    words.windows(2).any(|w| w[0] == "ORDER" && w[1] == "BY")
}

// ============================================================================
// Column rules
// ============================================================================

fn resolve_dataset(raw: &RawDataset) -> Result<DatasetSpec, ConfigError> {
    if raw.columns.is_empty() {
        return Err(ConfigError::InvalidColumn {
            dataset: raw.name.clone(),
            column: String::new(),
            message: "dataset has no columns".to_string(),
        });
    }
    let mut seen = HashSet::new();
    let columns = raw
        .columns
        .iter()
        .map(|column| {
            let invalid = |message: String| ConfigError::InvalidColumn {
                dataset: raw.name.clone(),
                column: column.name.clone(),
                message,
            };
            if !seen.insert(column.name.as_str()) {
                return Err(invalid("duplicate column name".to_string()));
            }
            let column_type =
                ColumnType::parse(&column.type_tag).map_err(|e| invalid(e.to_string()))?;
            let rule = resolve_rule(&column_type, &column.rule).map_err(invalid)?;
            Ok(ColumnSpec {
                name: column.name.clone(),
                column_type,
                rule,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DatasetSpec {
        name: raw.name.clone(),
        columns,
    })
}

/// Resolve the generation rule of one (possibly wrapped) type.
pub fn resolve_rule(column_type: &ColumnType, raw: &RawRule) -> Result<ValueRule, String> {
    match column_type {
        ColumnType::Nullable(inner) => {
            let p = raw.null_probability.unwrap_or(0.0);
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("null_probability {p} is outside [0, 1]"));
            }
            let inner_raw = RawRule {
                null_probability: None,
                ..raw.clone()
            };
            Ok(ValueRule::Nullable {
                null_probability: p,
                inner: Box::new(resolve_rule(inner, &inner_raw)?),
            })
        }
        ColumnType::LowCardinality(inner) => Ok(ValueRule::LowCardinality {
            inner: Box::new(resolve_rule(inner, raw)?),
        }),
        ColumnType::Array(inner) => {
            reject_null_probability(raw)?;
            if raw.values.is_some() {
                return Err("arrays take `range` (length) and `element`, not `values`".into());
            }
            let (min_length, max_length) = match &raw.range {
                Some(range) => {
                    let (lo, hi) = range_pair(range)?;
                    (yaml_u64(lo)? as usize, yaml_u64(hi)? as usize)
                }
                None => return Err("arrays require `range` with length bounds".into()),
            };
            check_order(min_length, max_length)?;
            let element = raw.element.as_deref().cloned().unwrap_or_default();
            Ok(ValueRule::Array {
                min_length,
                max_length,
                element: Box::new(resolve_rule(inner, &element)?),
            })
        }
        leaf => {
            reject_null_probability(raw)?;
            if raw.element.is_some() {
                return Err("`element` is only valid for Array types".into());
            }
            resolve_leaf(leaf, raw)
        }
    }
}

fn reject_null_probability(raw: &RawRule) -> Result<(), String> {
    if raw.null_probability.is_some() {
        return Err("null_probability requires a Nullable type".into());
    }
    Ok(())
}

fn resolve_leaf(column_type: &ColumnType, raw: &RawRule) -> Result<ValueRule, String> {
    if let Some(values) = &raw.values {
        if values.is_empty() {
            return Err("`values` must not be empty".into());
        }
    }

    match column_type {
        ColumnType::Int8 | ColumnType::Int16 | ColumnType::Int32 | ColumnType::Int64 => {
            let (min, max) = column_type.signed_bounds().unwrap_or((i64::MIN, i64::MAX));
            let convert = |v: &YamlValue| -> Result<i64, String> {
                let n = v
                    .as_i64()
                    .ok_or_else(|| format!("{v:?} is not an integer"))?;
                if n < min || n > max {
                    return Err(format!("{n} does not fit {column_type}"));
                }
                Ok(n)
            };
            Ok(ValueRule::Int {
                domain: resolve_domain(raw, convert)?,
            })
        }
        ColumnType::UInt8 | ColumnType::UInt16 | ColumnType::UInt32 | ColumnType::UInt64 => {
            let max = column_type.unsigned_max().unwrap_or(u64::MAX);
            let convert = |v: &YamlValue| -> Result<u64, String> {
                let n = yaml_u64(v)?;
                if n > max {
                    return Err(format!("{n} does not fit {column_type}"));
                }
                Ok(n)
            };
            Ok(ValueRule::UInt {
                domain: resolve_domain(raw, convert)?,
            })
        }
        ColumnType::Float32 | ColumnType::Float64 => {
            let limit = if matches!(column_type, ColumnType::Float32) {
                f32::MAX as f64
            } else {
                f64::MAX
            };
            let convert = |v: &YamlValue| -> Result<f64, String> {
                let f = v
                    .as_f64()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| format!("{v:?} is not a finite number"))?;
                if f.abs() > limit {
                    return Err(format!("{f} does not fit {column_type}"));
                }
                Ok(f)
            };
            let domain = resolve_domain(raw, convert)?;
            if let Domain::Range { min, max } = &domain {
                if !(max - min).is_finite() {
                    return Err(format!("range [{min}, {max}] is too wide to sample"));
                }
            }
            Ok(ValueRule::Float { domain })
        }
        ColumnType::String => {
            let domain = match (&raw.values, &raw.range) {
                (Some(values), _) => StringDomain::Values(
                    values
                        .iter()
                        .map(yaml_scalar_string)
                        .collect::<Result<_, _>>()?,
                ),
                (None, Some(range)) => {
                    let (lo, hi) = range_pair(range)?;
                    let (min, max) = (yaml_u64(lo)? as usize, yaml_u64(hi)? as usize);
                    check_order(min, max)?;
                    StringDomain::Length { min, max }
                }
                (None, None) => {
                    return Err("String columns require `range` (length bounds) or `values`".into())
                }
            };
            Ok(ValueRule::String { domain })
        }
        ColumnType::Date => Ok(ValueRule::Date {
            domain: resolve_domain(raw, |v| {
                let date = parse_date(&yaml_scalar_string(v)?)?;
                check_within(date, date_bounds(), column_type)
            })?,
        }),
        ColumnType::DateTime => Ok(ValueRule::DateTime {
            domain: resolve_domain(raw, |v| {
                let dt = parse_datetime(&yaml_scalar_string(v)?)?;
                check_within(dt, datetime_bounds(), column_type)
            })?,
        }),
        ColumnType::Uuid => {
            if raw.range.is_some() || raw.values.is_some() {
                return Err("UUID columns are not configurable".into());
            }
            Ok(ValueRule::Uuid)
        }
        ColumnType::Enum8(declared) | ColumnType::Enum16(declared) => {
            if raw.range.is_some() {
                return Err("Enum columns take `values`, not `range`".into());
            }
            let labels: Vec<String> = match &raw.values {
                Some(values) => {
                    let picked = values
                        .iter()
                        .map(yaml_scalar_string)
                        .collect::<Result<Vec<_>, _>>()?;
                    if let Some(bad) = picked.iter().find(|l| !declared.iter().any(|(d, _)| d == *l)) {
                        return Err(format!("'{bad}' is not a declared enum label"));
                    }
                    picked
                }
                None => declared.iter().map(|(label, _)| label.clone()).collect(),
            };
            Ok(ValueRule::Enum { labels })
        }
        ColumnType::Nullable(_) | ColumnType::Array(_) | ColumnType::LowCardinality(_) => {
            Err(format!("{column_type} is not a leaf type"))
        }
    }
}

fn resolve_domain<T: PartialOrd + std::fmt::Debug>(
    raw: &RawRule,
    convert: impl Fn(&YamlValue) -> Result<T, String>,
) -> Result<Domain<T>, String> {
    if let Some(values) = &raw.values {
        return Ok(Domain::Values(
            values.iter().map(&convert).collect::<Result<_, _>>()?,
        ));
    }
    match &raw.range {
        Some(range) => {
            let (lo, hi) = range_pair(range)?;
            let (min, max) = (convert(lo)?, convert(hi)?);
            check_order(&min, &max)?;
            Ok(Domain::Range { min, max })
        }
        None => Err("either `range` or `values` is required".into()),
    }
}

fn range_pair(range: &[YamlValue]) -> Result<(&YamlValue, &YamlValue), String> {
    match range {
        [lo, hi] => Ok((lo, hi)),
        _ => Err(format!(
            "`range` must have exactly two bounds, got {}",
            range.len()
        )),
    }
}

fn check_order<T: PartialOrd + std::fmt::Debug>(min: T, max: T) -> Result<(), String> {
    if min > max {
        return Err(format!("range lower bound {min:?} exceeds upper bound {max:?}"));
    }
    Ok(())
}

fn yaml_u64(value: &YamlValue) -> Result<u64, String> {
    value
        .as_u64()
        .ok_or_else(|| format!("{value:?} is not a non-negative integer"))
}

fn yaml_scalar_string(value: &YamlValue) -> Result<String, String> {
    match value {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        other => Err(format!("{other:?} is not a scalar")),
    }
}

/// Representable range of ClickHouse `Date` (unsigned 16-bit days).
fn date_bounds() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN),
        NaiveDate::from_ymd_opt(2149, 6, 6).unwrap_or(NaiveDate::MAX),
    )
}

/// Representable range of ClickHouse `DateTime` (unsigned 32-bit seconds).
fn datetime_bounds() -> (NaiveDateTime, NaiveDateTime) {
    let at = |secs: i64, fallback| {
        DateTime::from_timestamp(secs, 0).map_or(fallback, |dt| dt.naive_utc())
    };
    (at(0, NaiveDateTime::MIN), at(u32::MAX as i64, NaiveDateTime::MAX))
}

fn check_within<T: PartialOrd + std::fmt::Display>(
    value: T,
    (min, max): (T, T),
    column_type: &ColumnType,
) -> Result<T, String> {
    if value < min || value > max {
        return Err(format!("{value} is outside the {column_type} range {min}..={max}"));
    }
    Ok(value)
}

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| format!("invalid date '{text}': {e}"))
}

/// Accepts `YYYY-MM-DD hh:mm:ss`, RFC 3339, or a bare date (midnight).
fn parse_datetime(text: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(format!("invalid datetime '{text}'"))
}
