//! Query Result - row representation shared by engines, the enricher and the API

use rusqlite::types::ValueRef;
use serde_json::{Number, Value};

/// One result row: column name to scalar value, in projection order.
pub type ResultRow = serde_json::Map<String, Value>;

/// Convert a SQLite cell into JSON.
pub fn sqlite_value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

/// Read the single `total_count` cell produced by a `CountQuery`.
pub fn total_count(rows: &[ResultRow]) -> Option<i64> {
    rows.first()
        .and_then(|row| row.get("total_count"))
        .and_then(Value::as_i64)
}
