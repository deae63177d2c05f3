//! Conversion between logical [`Value`]s and SQLite storage values.
//!
//! Writes widen nothing: booleans bind as INTEGER `0`/`1` and timestamps as
//! RFC 3339 TEXT. Reads only ever produce `Null`, `Integer`, `Real`, `Text`
//! and `Blob`; column parse hooks turn those back into richer values.

use rusqlite::Row;
use rusqlite::types::{Value as SqlValue, ValueRef};
use schemastore_core::{Record, Value, format_timestamp};

use crate::error::Result;

/// Converts a logical value to the value bound as a statement parameter.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(ts) => SqlValue::Text(format_timestamp(ts)),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

/// Converts a list of logical values into bindable parameters.
pub(crate) fn to_params(values: &[Value]) -> Vec<SqlValue> {
    values.iter().map(to_sql).collect()
}

/// Converts a raw column value. Invalid UTF-8 in TEXT is replaced lossily.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

/// Reads every column of a row into a [`Record`], keyed by column name.
pub(crate) fn read_row(row: &Row<'_>, columns: &[String]) -> Result<Record> {
    let mut record = Record::new();
    for (idx, name) in columns.iter().enumerate() {
        record.insert(name.as_str(), from_sql(row.get_ref(idx)?));
    }
    Ok(record)
}
