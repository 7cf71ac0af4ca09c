//! DDL and system statements.

use bench_core::{DatasetSpec, SchemaDef};

/// Caches dropped before every measured pair.
pub const DROP_CACHE_STATEMENTS: &[&str] = &[
    "SYSTEM DROP MARK CACHE",
    "SYSTEM DROP UNCOMPRESSED CACHE",
    "SYSTEM DROP COMPILED EXPRESSION CACHE",
    "SYSTEM DROP QUERY CACHE",
];

/// Generate DROP TABLE statement.
pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS `{table}`")
}

/// Generate CREATE TABLE statement for a dataset under one physical design.
pub fn create_table(table: &str, dataset: &DatasetSpec, schema: &SchemaDef) -> String {
    let columns = dataset
        .columns
        .iter()
        .map(|c| format!("    `{}` {}", c.name, c.column_type))
        .collect::<Vec<_>>()
        .join(",\n");

    let mut sql = format!("CREATE TABLE `{table}`\n(\n{columns}\n)\nENGINE = {}", schema.engine);

    if let Some(partition) = &schema.partition_by {
        sql.push_str(&format!("\nPARTITION BY {partition}"));
    }
    if let Some(primary_key) = &schema.primary_key {
        sql.push_str(&format!("\nPRIMARY KEY ({})", primary_key.join(", ")));
    }
    if schema.order_by.is_empty() {
        sql.push_str("\nORDER BY tuple()");
    } else {
        sql.push_str(&format!("\nORDER BY ({})", schema.order_by.join(", ")));
    }
    if !schema.settings.is_empty() {
        let settings = schema
            .settings
            .iter()
            .map(|(k, v)| format!("{k} = {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!("\nSETTINGS {settings}"));
    }
    sql
}

pub fn optimize_final(table: &str) -> String {
    format!("OPTIMIZE TABLE `{table}` FINAL")
}

/// Active-part totals of one table in the current database.
pub fn storage_query(table: &str) -> String {
    format!(
        "SELECT sum(rows) AS rows, \
         sum(data_compressed_bytes) AS compressed_bytes, \
         sum(data_uncompressed_bytes) AS uncompressed_bytes \
         FROM system.parts \
         WHERE active AND database = currentDatabase() AND table = '{}'",
        escape_literal(table)
    )
}

/// Finished-query profiles for the given query ids.
pub fn profile_query(query_ids: &[String]) -> String {
    let ids = query_ids
        .iter()
        .map(|id| format!("'{}'", escape_literal(id)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT query_id, read_rows, read_bytes, written_rows, written_bytes, \
         result_rows, result_bytes, memory_usage, query_duration_ms, \
         ProfileEvents['RealTimeMicroseconds'] AS real_time_us, \
         ProfileEvents['UserTimeMicroseconds'] AS user_time_us, \
         ProfileEvents['SystemTimeMicroseconds'] AS system_time_us, \
         ProfileEvents['OSReadBytes'] AS os_read_bytes, \
         ProfileEvents['OSWriteBytes'] AS os_write_bytes, \
         ProfileEvents['SelectedParts'] AS selected_parts, \
         ProfileEvents['SelectedMarks'] AS selected_marks \
         FROM system.query_log \
         WHERE type = 'QueryFinish' AND query_id IN ({ids})"
    )
}

fn escape_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
