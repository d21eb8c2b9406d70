//! Sample database bootstrap
//!
//! Creates the TechCorp schema (HR tables plus a small sales ledger) and fills
//! it with fixture rows. Existing tables are dropped first, so running it
//! twice leaves the same data behind apart from random attendance statuses.

use crate::error::{QueryError, Result};
use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

const TABLES: &[&str] = &[
    "order_items",
    "orders",
    "products",
    "customers",
    "attendance",
    "projects",
    "employees",
    "departments",
];

const SCHEMA: &[&str] = &[
    "CREATE TABLE departments (
        department_id INTEGER PRIMARY KEY AUTOINCREMENT,
        department_name TEXT NOT NULL
    )",
    "CREATE TABLE employees (
        employee_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        department_id INTEGER,
        salary REAL,
        hire_date TEXT,
        FOREIGN KEY (department_id) REFERENCES departments(department_id)
    )",
    "CREATE TABLE projects (
        project_id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_name TEXT NOT NULL,
        department_id INTEGER,
        FOREIGN KEY (department_id) REFERENCES departments(department_id)
    )",
    "CREATE TABLE attendance (
        record_id INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id INTEGER,
        date TEXT,
        status TEXT,
        FOREIGN KEY (employee_id) REFERENCES employees(employee_id)
    )",
    "CREATE TABLE customers (
        customer_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        city TEXT,
        registration_date TEXT
    )",
    "CREATE TABLE products (
        product_id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_name TEXT,
        price REAL,
        stock INTEGER
    )",
    "CREATE TABLE orders (
        order_id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER,
        order_date TEXT,
        total_amount REAL,
        FOREIGN KEY (customer_id) REFERENCES customers(customer_id)
    )",
    "CREATE TABLE order_items (
        order_item_id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id INTEGER,
        product_id INTEGER,
        quantity INTEGER,
        FOREIGN KEY (order_id) REFERENCES orders(order_id),
        FOREIGN KEY (product_id) REFERENCES products(product_id)
    )",
];

const DEPARTMENTS: &[&str] = &[
    "Engineering",
    "HR",
    "Finance",
    "Marketing",
    "Sales",
    "Support",
    "Research",
    "IT",
    "Operations",
    "Legal",
];

const EMPLOYEES: &[(&str, i64, f64, &str)] = &[
    ("Aravind Kumar", 1, 70000.0, "2021-06-15"),
    ("Neha Singh", 2, 50000.0, "2022-03-10"),
    ("Rahul Das", 1, 65000.0, "2020-09-05"),
    ("Priya Sharma", 3, 85000.0, "2019-11-20"),
    ("Rohit Patel", 4, 60000.0, "2021-01-12"),
    ("Anjali Mehta", 5, 55000.0, "2023-02-18"),
];

const PROJECTS: &[(&str, i64)] = &[
    ("AI Chatbot System", 1),
    ("Recruitment Drive", 2),
    ("Financial Dashboard", 3),
    ("Brand Revamp", 4),
    ("CRM Automation", 5),
];

const ATTENDANCE_STATUSES: &[&str] = &["Present", "Absent", "Leave"];
const ATTENDANCE_DAYS: i64 = 10;

pub const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Vikram Rao", "Bangalore", "2024-11-01"),
    ("Kiran Das", "Chennai", "2024-11-02"),
    ("Sneha Iyer", "Mumbai", "2024-11-03"),
    ("Arun Nair", "Delhi", "2024-11-04"),
];

const PRODUCTS: &[(&str, f64, i64)] = &[
    ("Laptop", 55000.0, 10),
    ("Mouse", 700.0, 100),
    ("Keyboard", 1200.0, 50),
    ("Monitor", 10000.0, 20),
    ("Headphones", 2500.0, 30),
];

const ORDERS: &[(i64, &str, f64)] = &[
    (1, "2025-10-20", 57700.0),
    (2, "2025-10-21", 62000.0),
    (3, "2025-10-22", 13200.0),
];

const ORDER_ITEMS: &[(i64, i64, i64)] = &[
    (1, 1, 1),
    (1, 2, 1),
    (2, 1, 1),
    (2, 5, 2),
    (3, 3, 2),
    (3, 4, 1),
];

#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub tables: usize,
    pub rows: u64,
}

/// Attendance rows are drawn up front so no RNG is held across an await.
fn attendance_rows<R: Rng>(rng: &mut R) -> Result<Vec<(i64, String, &'static str)>> {
    let base = NaiveDate::from_ymd_opt(2025, 11, 1)
        .ok_or_else(|| QueryError::Config("invalid attendance base date".to_string()))?;

    let mut rows = Vec::new();
    for employee_id in 1..=EMPLOYEES.len() as i64 {
        for day in 1..=ATTENDANCE_DAYS {
            let date = base + Duration::days(day);
            let status = ATTENDANCE_STATUSES.choose(rng).copied().unwrap_or("Present");
            rows.push((employee_id, date.format("%Y-%m-%d").to_string(), status));
        }
    }
    Ok(rows)
}

/// Drop and recreate every sample table, then insert the fixture rows in one
/// transaction.
pub async fn seed_sample_data(pool: &SqlitePool) -> Result<SeedSummary> {
    let attendance = attendance_rows(&mut rand::thread_rng())?;

    let mut tx = pool.begin().await.map_err(QueryError::from_acquire)?;
    let mut rows = 0u64;

    for table in TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?;
    }
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&mut *tx).await.map_err(seed_error)?;
    }

    for name in DEPARTMENTS {
        rows += sqlx::query("INSERT INTO departments (department_name) VALUES (?)")
            .bind(*name)
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?
            .rows_affected();
    }

    for (name, department_id, salary, hire_date) in EMPLOYEES {
        rows += sqlx::query(
            "INSERT INTO employees (name, department_id, salary, hire_date) VALUES (?, ?, ?, ?)",
        )
        .bind(*name)
        .bind(*department_id)
        .bind(*salary)
        .bind(*hire_date)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?
        .rows_affected();
    }

    for (name, department_id) in PROJECTS {
        rows += sqlx::query("INSERT INTO projects (project_name, department_id) VALUES (?, ?)")
            .bind(*name)
            .bind(*department_id)
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?
            .rows_affected();
    }

    for (employee_id, date, status) in &attendance {
        rows += sqlx::query("INSERT INTO attendance (employee_id, date, status) VALUES (?, ?, ?)")
            .bind(*employee_id)
            .bind(date.as_str())
            .bind(*status)
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?
            .rows_affected();
    }

    for (name, city, registered) in CUSTOMERS {
        rows += sqlx::query(
            "INSERT INTO customers (name, city, registration_date) VALUES (?, ?, ?)",
        )
        .bind(*name)
        .bind(*city)
        .bind(*registered)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?
        .rows_affected();
    }

    for (name, price, stock) in PRODUCTS {
        rows += sqlx::query("INSERT INTO products (product_name, price, stock) VALUES (?, ?, ?)")
            .bind(*name)
            .bind(*price)
            .bind(*stock)
            .execute(&mut *tx)
            .await
            .map_err(seed_error)?
            .rows_affected();
    }

    for (customer_id, order_date, total) in ORDERS {
        rows += sqlx::query(
            "INSERT INTO orders (customer_id, order_date, total_amount) VALUES (?, ?, ?)",
        )
        .bind(*customer_id)
        .bind(*order_date)
        .bind(*total)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?
        .rows_affected();
    }

    for (order_id, product_id, quantity) in ORDER_ITEMS {
        rows += sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity) VALUES (?, ?, ?)",
        )
        .bind(*order_id)
        .bind(*product_id)
        .bind(*quantity)
        .execute(&mut *tx)
        .await
        .map_err(seed_error)?
        .rows_affected();
    }

    tx.commit().await.map_err(seed_error)?;

    info!(tables = TABLES.len(), rows, "Sample database seeded");
    Ok(SeedSummary {
        tables: TABLES.len(),
        rows,
    })
}

fn seed_error(err: sqlx::Error) -> QueryError {
    QueryError::Execution(format!("Seeding failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sqlx::sqlite::SqlitePoolOptions;

    #[test]
    fn test_attendance_covers_every_employee_for_ten_days() {
        let mut rng = StdRng::seed_from_u64(7);
        let rows = attendance_rows(&mut rng).unwrap();
        assert_eq!(rows.len(), EMPLOYEES.len() * ATTENDANCE_DAYS as usize);
        assert_eq!(rows[0].1, "2025-11-02");
        assert_eq!(rows[9].1, "2025-11-11");
        assert!(rows.iter().all(|(_, _, s)| ATTENDANCE_STATUSES.contains(s)));
    }

    #[tokio::test]
    async fn test_seed_is_repeatable() {
        // A single connection, since every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let first = seed_sample_data(&pool).await.unwrap();
        let second = seed_sample_data(&pool).await.unwrap();
        assert_eq!(first.rows, second.rows);

        let customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(customers, CUSTOMERS.len() as i64);
    }
}
