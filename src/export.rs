//! Rendering execution outcomes for download and terminal output

use crate::error::Result;
use crate::models::{ExecutionOutcome, Row};
use crate::translator::RuleSummary;
use itertools::Itertools;
use serde_json::Value;

/// Column names across all rows, first-seen order.
pub fn columns(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.keys())
        .unique()
        .cloned()
        .collect()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// CSV with a header line. A write outcome becomes a single
/// `message,rowsAffected` record.
pub fn to_csv(outcome: &ExecutionOutcome) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match outcome {
        ExecutionOutcome::Rows(rows) => {
            let header = columns(rows);
            if !header.is_empty() {
                writer.write_record(&header)?;
            }
            for row in rows {
                writer.write_record(header.iter().map(|c| cell(row.get(c))))?;
            }
        }
        ExecutionOutcome::Write {
            message,
            rows_affected,
        } => {
            writer.write_record(["message", "rowsAffected"])?;
            writer.write_record([message.clone(), rows_affected.to_string()])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Plain aligned text table for the command line.
pub fn to_table(outcome: &ExecutionOutcome) -> String {
    let rows = match outcome {
        ExecutionOutcome::Rows(rows) => rows,
        ExecutionOutcome::Write {
            message,
            rows_affected,
        } => return format!("{} ({} rows affected)", message, rows_affected),
    };
    if rows.is_empty() {
        return "(no rows)".to_string();
    }

    let header = columns(rows);
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| header.iter().map(|c| cell(row.get(c))).collect())
        .collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, name)| {
            body.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .join(" | ")
    };

    let mut out = vec![
        line(&header),
        widths.iter().map(|w| "-".repeat(*w)).join("-+-"),
    ];
    out.extend(body.iter().map(|r| line(r)));
    out.push(format!("({} rows)", rows.len()));
    out.join("\n")
}

/// One line per rule in precedence order: position, id, statement kind and predicate.
pub fn rules_table(rules: &[RuleSummary]) -> String {
    rules
        .iter()
        .map(|rule| {
            format!(
                "{:>2}  {:<26} {:<6} {}",
                rule.position,
                rule.id,
                format!("{:?}", rule.kind).to_lowercase(),
                rule.predicate
            )
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ExecutionOutcome {
        let rows = vec![
            json!({"name": "Rajesh Kumar", "city": "Mumbai", "total": 80000.0}),
            json!({"name": "Priya, S", "city": null, "total": 5}),
        ]
        .into_iter()
        .map(|v| match v {
            Value::Object(map) => map,
            _ => unreachable!(),
        })
        .collect();
        ExecutionOutcome::Rows(rows)
    }

    #[test]
    fn test_csv_quotes_and_blanks_nulls() {
        let csv = to_csv(&sample()).unwrap();
        assert_eq!(
            csv,
            "name,city,total\nRajesh Kumar,Mumbai,80000.0\n\"Priya, S\",,5\n"
        );
    }

    #[test]
    fn test_csv_of_write_outcome() {
        let csv = to_csv(&ExecutionOutcome::write(3)).unwrap();
        assert_eq!(csv, "message,rowsAffected\nExecuted successfully,3\n");
    }

    #[test]
    fn test_rules_table_lists_default_rules_without_a_store() {
        let listing = rules_table(&crate::translator::default_rules().summaries());
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 16);
        assert!(lines[0].starts_with(" 0  customers_in_mumbai"));
        assert!(lines[0].contains(" read "));
        assert!(lines[15].contains("default_customers"));
        assert!(lines[15].ends_with("always"));
    }

    #[test]
    fn test_table_layout() {
        let table = to_table(&sample());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "name         | city   | total  ");
        assert!(lines[1].starts_with("-------------+-"));
        assert_eq!(lines.last(), Some(&"(2 rows)"));
        assert_eq!(to_table(&ExecutionOutcome::Rows(vec![])), "(no rows)");
    }
}
