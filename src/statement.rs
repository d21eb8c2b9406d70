//! Statement classification
//!
//! The executor decides between the read and write path from the leading
//! keyword alone. `validate` is the stricter, parser-backed check used to audit
//! templates once at startup.

use crate::error::{QueryError, Result};
use serde::Serialize;
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Retrieves data only; no commit needed.
    Read,
    /// Mutates data or schema; must be committed.
    Write,
}

const READ_KEYWORD: &str = "SELECT";

/// Classify by leading keyword (case-insensitive, whitespace-trimmed).
pub fn classify(sql: &str) -> StatementKind {
    let leading = sql
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or("");

    if leading.eq_ignore_ascii_case(READ_KEYWORD) {
        StatementKind::Read
    } else {
        StatementKind::Write
    }
}

/// Parse `sql` and confirm it is a single statement whose parsed kind agrees
/// with [`classify`].
pub fn validate(sql: &str) -> Result<StatementKind> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
        .map_err(|e| QueryError::InvalidStatement(format!("{}: {}", e, sql.trim())))?;

    let statement = match statements.as_slice() {
        [single] => single,
        [] => return Err(QueryError::InvalidStatement("empty statement".to_string())),
        many => {
            return Err(QueryError::InvalidStatement(format!(
                "expected one statement, found {}",
                many.len()
            )))
        }
    };

    let parsed = match statement {
        Statement::Query(_) => StatementKind::Read,
        _ => StatementKind::Write,
    };

    let claimed = classify(sql);
    if parsed != claimed {
        return Err(QueryError::InvalidStatement(format!(
            "statement parses as {:?} but its leading keyword routes it as {:?}",
            parsed, claimed
        )));
    }

    Ok(parsed)
}
