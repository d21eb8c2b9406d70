//! Converting SQLite result rows to JSON mappings

use crate::error::{QueryError, Result};
use crate::models::Row;
use serde_json::Value;
use sqlx::sqlite::{Sqlite, SqliteRow, SqliteValueRef};
use sqlx::{Column, Decode, Row as _, TypeInfo, ValueRef};

/// Runtime storage class of a single SQLite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    fn of(value: &SqliteValueRef<'_>) -> Self {
        if value.is_null() {
            return StorageClass::Null;
        }
        match value.type_info().name() {
            "INTEGER" | "BOOLEAN" => StorageClass::Integer,
            "REAL" | "NUMERIC" => StorageClass::Real,
            "BLOB" => StorageClass::Blob,
            "NULL" => StorageClass::Null,
            _ => StorageClass::Text,
        }
    }
}

/// Build one ordered name-to-value mapping from a result row.
pub fn row_to_json(row: &SqliteRow) -> Result<Row> {
    let mut mapped = Row::new();
    for column in row.columns() {
        let raw = row
            .try_get_raw(column.ordinal())
            .map_err(|e| QueryError::Execution(e.to_string()))?;
        let value = value_to_json(raw)
            .map_err(|e| QueryError::Execution(format!("column '{}': {}", column.name(), e)))?;
        mapped.insert(column.name().to_string(), value);
    }
    Ok(mapped)
}

fn value_to_json(raw: SqliteValueRef<'_>) -> std::result::Result<Value, sqlx::error::BoxDynError> {
    let value = match StorageClass::of(&raw) {
        StorageClass::Null => Value::Null,
        StorageClass::Integer => Value::from(<i64 as Decode<'_, Sqlite>>::decode(raw)?),
        StorageClass::Real => {
            let n = <f64 as Decode<'_, Sqlite>>::decode(raw)?;
            serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        StorageClass::Text => Value::from(<String as Decode<'_, Sqlite>>::decode(raw)?),
        StorageClass::Blob => Value::from(<Vec<u8> as Decode<'_, Sqlite>>::decode(raw)?),
    };
    Ok(value)
}
