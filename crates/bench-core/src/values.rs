//! Generated values, rows and batches.
//!
//! A [`Batch`] is the unit of insertion and the unit of memory bounding: the
//! generator refills one batch buffer per iteration and the distributor hands
//! the same buffer to every table before the next batch is produced.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One generated cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    /// Enum label, stored by name.
    Enum(String),
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Text rendering used for logs and in-memory comparisons. It mirrors the
/// server's TabSeparated output for scalar values.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "\\N"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) | Value::Enum(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match item {
                        Value::String(s) | Value::Enum(s) => write!(f, "'{s}'")?,
                        Value::Date(_) | Value::DateTime(_) | Value::Uuid(_) => {
                            write!(f, "'{item}'")?
                        }
                        Value::Null => write!(f, "NULL")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

/// One generated row; cells follow the dataset's column order.
pub type Row = Vec<Value>;

/// One bounded chunk of generated rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Zero-based position of this batch within the scenario's dataset.
    pub index: u64,
    /// Rows in generation order.
    pub rows: Vec<Row>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows returned by one query execution, one string per cell.
///
/// Cells are kept exactly as the service rendered them so comparisons
/// across tables are bit-exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
