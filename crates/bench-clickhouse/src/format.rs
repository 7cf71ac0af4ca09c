//! Wire formats: `JSONEachRow` for inserts, `TabSeparated` for results.

use bench_core::{Batch, DatasetSpec, ResultSet, Value};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// JSON rendering of one generated value in the shape ClickHouse's
/// `JSONEachRow` input expects.
struct JsonValue<'a>(&'a Value);

impl Serialize for JsonValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Null => serializer.serialize_none(),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::String(v) | Value::Enum(v) => serializer.serialize_str(v),
            Value::Date(_) | Value::DateTime(_) | Value::Uuid(_) => {
                serializer.collect_str(self.0)
            }
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&JsonValue(item))?;
                }
                seq.end()
            }
        }
    }
}

/// One row as a JSON object keyed by column name.
struct JsonRow<'a> {
    columns: &'a [&'a str],
    row: &'a [Value],
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.row) {
            map.serialize_entry(column, &JsonValue(value))?;
        }
        map.end()
    }
}

/// Encode a batch as newline-delimited JSON objects, in batch order.
pub fn encode_json_each_row(dataset: &DatasetSpec, batch: &Batch) -> Result<String, serde_json::Error> {
    let columns = dataset.column_names();
    let mut out = Vec::with_capacity(batch.len() * 64);
    for row in &batch.rows {
        serde_json::to_writer(
            &mut out,
            &JsonRow {
                columns: &columns,
                row,
            },
        )?;
        out.push(b'\n');
    }
    // serde_json only emits valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Split `TabSeparated` output into rows of raw cell strings. Escapes are
/// kept as the server wrote them.
pub fn parse_tab_separated(text: &str) -> ResultSet {
    if text.is_empty() {
        return ResultSet::default();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    let rows = body
        .split('\n')
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect();
    ResultSet::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::{ColumnSpec, ColumnType, ValueRule};
    use chrono::NaiveDate;

    fn dataset(names: &[&str]) -> DatasetSpec {
        DatasetSpec {
            name: "d".into(),
            columns: names
                .iter()
                .map(|n| ColumnSpec {
                    name: n.to_string(),
                    column_type: ColumnType::Uuid,
                    rule: ValueRule::Uuid,
                })
                .collect(),
        }
    }

    #[test]
    fn test_encode_scalars() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 5)
            .unwrap();
        let batch = Batch {
            index: 0,
            rows: vec![vec![
                Value::Int(-3),
                Value::UInt(u64::MAX),
                Value::String("a\"b".into()),
                Value::DateTime(ts),
                Value::Null,
            ]],
        };
        let encoded = encode_json_each_row(&dataset(&["i", "u", "s", "ts", "n"]), &batch).unwrap();
        assert_eq!(
            encoded,
            "{\"i\":-3,\"u\":18446744073709551615,\"s\":\"a\\\"b\",\"ts\":\"2024-03-01 12:00:05\",\"n\":null}\n"
        );
    }

    #[test]
    fn test_encode_arrays_and_uuid() {
        let id = uuid::Uuid::nil();
        let batch = Batch {
            index: 0,
            rows: vec![
                vec![Value::Uuid(id), Value::Array(vec![Value::Enum("x".into()), Value::Null])],
                vec![Value::Uuid(id), Value::Array(vec![])],
            ],
        };
        let encoded = encode_json_each_row(&dataset(&["id", "tags"]), &batch).unwrap();
        let lines: Vec<&str> = encoded.lines().collect();
        assert_eq!(
            lines,
            vec![
                "{\"id\":\"00000000-0000-0000-0000-000000000000\",\"tags\":[\"x\",null]}",
                "{\"id\":\"00000000-0000-0000-0000-000000000000\",\"tags\":[]}",
            ]
        );
    }

    #[test]
    fn test_parse_tab_separated() {
        let result = parse_tab_separated("US\t10\nDE\t\\N\n");
        assert_eq!(
            result.rows,
            vec![
                vec!["US".to_string(), "10".to_string()],
                vec!["DE".to_string(), "\\N".to_string()],
            ]
        );
        assert!(parse_tab_separated("").is_empty());
    }
}
