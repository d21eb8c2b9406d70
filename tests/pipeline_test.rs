mod common;

use common::{count, seeded_pool};
use serde_json::json;
use std::sync::Arc;
use text_to_sql::execution::SqliteEngine;
use text_to_sql::models::{ExecutionOutcome, Question};
use text_to_sql::schema::SchemaIntrospector;
use text_to_sql::translator::{Predicate, Rule, RuleTable};
use text_to_sql::{ErrorKind, QueryService};

fn missing_table() -> String {
    "SELECT * FROM invoices;".to_string()
}

fn duplicate_customer() -> String {
    "INSERT INTO customers (customer_id, name, city) VALUES (99, 'New', 'Pune'), (1, 'Dup', 'Pune');"
        .to_string()
}

fn add_customer() -> String {
    "INSERT INTO customers (name, city, registration_date) VALUES ('Meera Pillai', 'Pune', '2024-12-01');"
        .to_string()
}

fn everyone() -> String {
    "SELECT * FROM customers;".to_string()
}

fn custom_service(pool: sqlx::SqlitePool, table: RuleTable) -> QueryService {
    QueryService::new(
        Arc::new(table),
        Arc::new(SqliteEngine::new(pool.clone())),
        SchemaIntrospector::new(pool),
    )
}

#[tokio::test]
async fn test_show_all_customers_returns_every_seeded_row() {
    let (_dir, pool) = seeded_pool().await;
    let service = QueryService::from_pool(pool, false);

    let response = service.execute(&Question::new("Show all customers")).await;
    assert_eq!(response.rule_id, Some("list_customers"));
    assert!(response.error.is_none(), "{:?}", response.error);

    let rows = response.results.as_ref().and_then(|o| o.rows()).unwrap();
    assert_eq!(rows.len(), 4);
    for row in rows {
        let keys: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["customer_id", "name", "city", "registration_date"]);
    }
    // Newest registration first.
    assert_eq!(rows[0]["name"], json!("Arun Nair"));
}

#[tokio::test]
async fn test_revenue_by_city_is_ordered_by_total() {
    let (_dir, pool) = seeded_pool().await;
    let service = QueryService::from_pool(pool, false);

    let response = service.execute(&Question::new("total revenue by city")).await;
    assert!(response.sql.contains("GROUP BY c.city"));
    let rows = response.results.as_ref().and_then(|o| o.rows()).unwrap();
    let cities: Vec<&str> = rows.iter().map(|r| r["city"].as_str().unwrap()).collect();
    assert_eq!(cities, vec!["Chennai", "Bangalore", "Mumbai"]);
    assert_eq!(rows[0]["total_revenue"], json!(62000.0));
}

#[tokio::test]
async fn test_unrecognized_question_falls_back() {
    let (_dir, pool) = seeded_pool().await;
    let service = QueryService::from_pool(pool, false);

    let generated = service.generate(&Question::new("asdfasdf"));
    assert_eq!(generated.rule_id, Some("default_customers"));
    assert_eq!(generated.sql, "SELECT * FROM customers LIMIT 10;");

    let executed = service.execute(&Question::new("")).await;
    assert!(executed.error.is_none());
    assert_eq!(executed.results.and_then(|o| o.rows().map(|r| r.len())), Some(4));
}

#[tokio::test]
async fn test_schema_lists_seeded_tables_in_declaration_order() {
    let (_dir, pool) = seeded_pool().await;
    let service = QueryService::from_pool(pool, false);

    let schema = service.schema().await.unwrap().schema;
    assert!(schema.contains_key("customers"));
    assert!(schema.contains_key("orders"));
    assert!(!schema.contains_key("sqlite_sequence"));

    let orders: Vec<&str> = schema["orders"].iter().map(|c| c.name.as_str()).collect();
    assert_eq!(orders, vec!["order_id", "customer_id", "order_date", "total_amount"]);
    let customers: Vec<&str> = schema["customers"].iter().map(|c| c.name.as_str()).collect();
    assert_eq!(customers, vec!["customer_id", "name", "city", "registration_date"]);
}

#[tokio::test]
async fn test_failed_statements_leave_store_unchanged() {
    let (_dir, pool) = seeded_pool().await;
    let table = RuleTable::builder()
        .rule(Rule::new("invoices", Predicate::contains("invoice"), missing_table))
        .rule(Rule::new("duplicate", Predicate::contains("duplicate"), duplicate_customer))
        .fallback(Rule::fallback("everyone", everyone));
    let service = custom_service(pool.clone(), table);

    let response = service.execute(&Question::new("show invoices")).await;
    assert_eq!(response.sql, "SELECT * FROM invoices;");
    assert!(response.error.as_deref().unwrap().contains("no such table"));
    assert_eq!(response.error_kind, Some(ErrorKind::Execution));
    assert!(!response.is_fatal());

    // First row would insert, second violates the primary key.
    let response = service.execute(&Question::new("add a duplicate")).await;
    assert!(response.error.is_some());
    assert!(response.results.is_none());
    assert_eq!(count(&pool, "customers").await, 4);
}

#[tokio::test]
async fn test_write_is_committed_before_success_is_reported() {
    let (_dir, pool) = seeded_pool().await;
    let table = RuleTable::builder()
        .rule(Rule::new("add", Predicate::contains("add"), add_customer))
        .fallback(Rule::fallback("everyone", everyone));
    let service = custom_service(pool.clone(), table);
    assert!(service.classifier_ready());

    let response = service.execute(&Question::new("Add Meera")).await;
    assert_eq!(response.results, Some(ExecutionOutcome::write(1)));
    assert_eq!(
        serde_json::to_value(&response.results).unwrap(),
        json!({"message": "Executed successfully", "rowsAffected": 1})
    );
    assert_eq!(count(&pool, "customers").await, 5);
}

#[tokio::test]
async fn test_status_reports_capability_flag() {
    let (_dir, pool) = seeded_pool().await;
    let service = QueryService::from_pool(pool, false);
    let status = service.status().await;
    assert!(status.healthy);
    assert!(status.classifier_ready);
    assert_eq!(status.status, "healthy");
}
