//! Shared data types for the translate / execute / introspect pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// SQL dialect a question targets. Only SQLite is served today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
}

/// A free-text question submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,

    #[serde(rename = "database_type", default)]
    pub dialect: Dialect,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dialect: Dialect::Sqlite,
        }
    }
}

/// Result of applying the rule table to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub sql: String,
    pub rule_id: &'static str,
}

/// One result row: column name to value, in result column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

pub const WRITE_SUCCESS_MESSAGE: &str = "Executed successfully";

/// What running a statement produced. Exactly one variant per outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecutionOutcome {
    /// Read path: every row the statement returned.
    Rows(Vec<Row>),

    /// Write path: the statement was committed.
    #[serde(rename_all = "camelCase")]
    Write { message: String, rows_affected: u64 },
}

impl ExecutionOutcome {
    pub fn write(rows_affected: u64) -> Self {
        ExecutionOutcome::Write {
            message: WRITE_SUCCESS_MESSAGE.to_string(),
            rows_affected,
        }
    }

    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            ExecutionOutcome::Rows(rows) => Some(rows),
            ExecutionOutcome::Write { .. } => None,
        }
    }

    pub fn rows_affected(&self) -> Option<u64> {
        match self {
            ExecutionOutcome::Rows(_) => None,
            ExecutionOutcome::Write { rows_affected, .. } => Some(*rows_affected),
        }
    }
}

/// Column metadata as declared in the live database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,

    /// Declared type, verbatim. Empty for untyped SQLite columns.
    #[serde(rename = "type")]
    pub declared_type: String,

    pub not_null: bool,
    pub primary_key: bool,
}

/// Table name to its columns in declaration order.
pub type SchemaDescriptor = BTreeMap<String, Vec<ColumnDescriptor>>;

/// A value together with the wall-clock time it took to produce.
#[derive(Debug, Clone)]
pub struct TimedResult<T> {
    pub value: T,
    pub elapsed: Duration,
}

impl<T> TimedResult<T> {
    pub fn measure<F>(f: F) -> Self
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let value = f();
        Self {
            value,
            elapsed: start.elapsed(),
        }
    }

    pub async fn measure_async<Fut>(fut: Fut) -> Self
    where
        Fut: std::future::Future<Output = T>,
    {
        let start = Instant::now();
        let value = fut.await;
        Self {
            value,
            elapsed: start.elapsed(),
        }
    }

    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_defaults_to_sqlite() {
        let q: Question = serde_json::from_value(json!({"question": "Show all customers"})).unwrap();
        assert_eq!(q.text, "Show all customers");
        assert_eq!(q.dialect, Dialect::Sqlite);
    }

    #[test]
    fn test_unknown_dialect_is_rejected() {
        let parsed = serde_json::from_value::<Question>(json!({
            "question": "Show all customers",
            "database_type": "oracle"
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_write_outcome_wire_shape() {
        let value = serde_json::to_value(ExecutionOutcome::write(3)).unwrap();
        assert_eq!(value, json!({"message": "Executed successfully", "rowsAffected": 3}));
    }

    #[test]
    fn test_rows_keep_column_order() {
        let mut row = Row::new();
        row.insert("name".into(), json!("Vikram Rao"));
        row.insert("city".into(), json!("Bangalore"));
        row.insert("customer_id".into(), json!(1));

        let text = serde_json::to_string(&ExecutionOutcome::Rows(vec![row])).unwrap();
        assert_eq!(text, r#"[{"name":"Vikram Rao","city":"Bangalore","customer_id":1}]"#);
    }
}
