//! Rule Table
//!
//! An ordered, immutable list of (predicate, template) pairs. The first rule
//! whose predicate matches the normalized question wins. Every table ends in a
//! fallback rule that always matches, so lookup is total.
//!
//! Templates take no arguments: a question only ever selects a statement, it
//! never contributes text to one.

use crate::error::{QueryError, Result};
use crate::statement::{self, StatementKind};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A pure function producing one complete SQL statement.
pub type Template = fn() -> String;

/// Keyword test over normalized (lower-cased, whitespace-collapsed) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Contains(&'static str),
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
    Always,
}

impl Predicate {
    pub fn contains(keyword: &'static str) -> Self {
        Predicate::Contains(keyword)
    }

    /// Every keyword must appear.
    pub fn all(keywords: &[&'static str]) -> Self {
        Predicate::AllOf(keywords.iter().copied().map(Predicate::Contains).collect())
    }

    /// At least one keyword must appear.
    pub fn any(keywords: &[&'static str]) -> Self {
        Predicate::AnyOf(keywords.iter().copied().map(Predicate::Contains).collect())
    }

    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Predicate::Contains(keyword) => normalized.contains(keyword),
            Predicate::AllOf(parts) => parts.iter().all(|p| p.matches(normalized)),
            Predicate::AnyOf(parts) => parts.iter().any(|p| p.matches(normalized)),
            Predicate::Always => true,
        }
    }

    /// Human-readable form for auditing.
    pub fn describe(&self) -> String {
        match self {
            Predicate::Contains(keyword) => format!("'{}'", keyword),
            Predicate::AllOf(parts) => join_parts(parts, " AND "),
            Predicate::AnyOf(parts) => join_parts(parts, " OR "),
            Predicate::Always => "always".to_string(),
        }
    }
}

fn join_parts(parts: &[Predicate], sep: &str) -> String {
    let inner: Vec<String> = parts.iter().map(|p| p.describe()).collect();
    if inner.len() > 1 {
        format!("({})", inner.join(sep))
    } else {
        inner.join(sep)
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub id: &'static str,
    pub description: &'static str,
    /// A question this rule is meant to answer
    pub example: Option<&'static str>,
    pub predicate: Predicate,
    pub template: Template,
}

impl Rule {
    pub fn new(id: &'static str, predicate: Predicate, template: Template) -> Self {
        Self {
            id,
            description: "",
            example: None,
            predicate,
            template,
        }
    }

    /// A rule that matches anything. Used to close a table.
    pub fn fallback(id: &'static str, template: Template) -> Self {
        Self::new(id, Predicate::Always, template)
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn example(mut self, example: &'static str) -> Self {
        self.example = Some(example);
        self
    }

    pub fn render(&self) -> String {
        (self.template)()
    }
}

/// Audit view of a rule, as exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSummary {
    pub position: usize,
    pub id: &'static str,
    pub description: &'static str,
    pub predicate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<&'static str>,
    pub kind: StatementKind,
}

#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
    fallback: Rule,
}

impl RuleTable {
    pub fn builder() -> RuleTableBuilder {
        RuleTableBuilder { rules: Vec::new() }
    }

    /// First rule (in declaration order) whose predicate matches; the fallback otherwise.
    pub fn first_match(&self, normalized: &str) -> &Rule {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(normalized))
            .unwrap_or(&self.fallback)
    }

    /// All rules in precedence order, fallback last.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().chain(std::iter::once(&self.fallback))
    }

    pub fn len(&self) -> usize {
        self.rules.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn fallback(&self) -> &Rule {
        &self.fallback
    }

    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.rules()
            .enumerate()
            .map(|(position, rule)| RuleSummary {
                position,
                id: rule.id,
                description: rule.description,
                predicate: rule.predicate.describe(),
                example: rule.example,
                kind: statement::classify(&rule.render()),
            })
            .collect()
    }

    /// Check the table is well-formed: unique ids, every template non-empty
    /// and parseable as a single statement of the kind its keyword claims,
    /// and no `Always` predicate shadowing later rules.
    pub fn verify(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (position, rule) in self.rules().enumerate() {
            if !seen.insert(rule.id) {
                return Err(QueryError::InvalidStatement(format!(
                    "duplicate rule id '{}'",
                    rule.id
                )));
            }

            if position < self.rules.len() && rule.predicate == Predicate::Always {
                return Err(QueryError::InvalidStatement(format!(
                    "rule '{}' always matches and shadows every later rule",
                    rule.id
                )));
            }

            let sql = rule.render();
            if sql.trim().is_empty() {
                return Err(QueryError::InvalidStatement(format!(
                    "rule '{}' produced an empty statement",
                    rule.id
                )));
            }
            statement::validate(&sql).map_err(|e| {
                QueryError::InvalidStatement(format!("rule '{}': {}", rule.id, e))
            })?;
        }
        Ok(())
    }
}

pub struct RuleTableBuilder {
    rules: Vec<Rule>,
}

impl RuleTableBuilder {
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Close the table with a catch-all rule.
    pub fn fallback(self, rule: Rule) -> RuleTable {
        RuleTable {
            rules: self.rules,
            fallback: Rule {
                predicate: Predicate::Always,
                ..rule
            },
        }
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_RULES: Arc<RuleTable> = Arc::new(build_default_rules());
}

/// The process-wide rule table for the sample database.
pub fn default_rules() -> Arc<RuleTable> {
    Arc::clone(&DEFAULT_RULES)
}

fn build_default_rules() -> RuleTable {
    RuleTable::builder()
        // Sales
        .rule(
            Rule::new(
                "customers_in_mumbai",
                Predicate::all(&["customers", "mumbai"]),
                customers_in_mumbai,
            )
            .describe("Purchase totals for customers based in Mumbai")
            .example("Show customers from Mumbai with their purchases"),
        )
        .rule(
            Rule::new("revenue_by_city", Predicate::contains("total revenue"), revenue_by_city)
                .describe("Revenue summed per customer city, highest first")
                .example("What is the total revenue by city?"),
        )
        .rule(
            Rule::new("list_customers", Predicate::contains("all customers"), list_customers)
                .describe("Every customer, newest registration first")
                .example("Show all customers"),
        )
        .rule(
            Rule::new("order_overview", Predicate::all(&["orders", "status"]), order_overview)
                .describe("Orders with their customer, most recent first")
                .example("What is the status of all orders?"),
        )
        .rule(
            Rule::new("products_by_price", Predicate::contains("products"), products_by_price)
                .describe("Product catalogue, most expensive first")
                .example("Show all products sorted by price"),
        )
        .rule(
            Rule::new(
                "order_count_by_customer",
                Predicate::any(&["orders count", "number of orders"]),
                order_count_by_customer,
            )
            .describe("Number of orders per customer, including customers without orders")
            .example("Number of orders per customer"),
        )
        // HR
        .rule(
            Rule::new(
                "projects_by_department",
                Predicate::all(&["project", "department"]),
                projects_by_department,
            )
            .describe("Projects with the department that owns them")
            .example("List all projects and their respective departments."),
        )
        .rule(
            Rule::new(
                "attendance_summary",
                Predicate::any(&["attendance", "present", "absent"]),
                attendance_summary,
            )
            .describe("Attendance counts per day and status")
            .example("Display attendance records for November 2025."),
        )
        .rule(
            Rule::new(
                "headcount_by_department",
                Predicate::AllOf(vec![
                    Predicate::contains("employee"),
                    Predicate::contains("department"),
                    Predicate::any(&["how many", "number of", "count"]),
                ]),
                headcount_by_department,
            )
            .describe("Employee count per department")
            .example("Show total number of employees in each department."),
        )
        .rule(
            Rule::new(
                "top_earner",
                Predicate::any(&["highest salary", "highest paid", "top earner"]),
                top_earner,
            )
            .describe("The single best-paid employee")
            .example("Which employee has the highest salary in TechCorp?"),
        )
        .rule(
            Rule::new("employees_by_salary", Predicate::contains("salary"), employees_by_salary)
                .describe("Employees ordered by salary, highest first")
                .example("Find employees with salary above 60,000."),
        )
        .rule(
            Rule::new(
                "employees_by_hire_date",
                Predicate::any(&["joined", "hired", "hire date"]),
                employees_by_hire_date,
            )
            .describe("Employees ordered by hire date, most recent first")
            .example("Find employees who joined after 2022."),
        )
        .rule(
            Rule::new(
                "employees_by_department",
                Predicate::all(&["employee", "department"]),
                employees_by_department,
            )
            .describe("Employees grouped under their department")
            .example("Show all employees in the Engineering department."),
        )
        .rule(
            Rule::new("list_employees", Predicate::contains("employee"), list_employees)
                .describe("Every employee by name")
                .example("List employees"),
        )
        .rule(
            Rule::new("list_departments", Predicate::contains("department"), list_departments)
                .describe("Every department by name")
                .example("Which departments exist?"),
        )
        .fallback(
            Rule::fallback("default_customers", default_customers)
                .describe("Bounded sample of customers when nothing else matches"),
        )
}

// ============================================================================
// Templates
// ============================================================================

fn customers_in_mumbai() -> String {
    "SELECT c.name, c.city, SUM(o.total_amount) AS total_purchases \
     FROM customers c JOIN orders o ON c.customer_id = o.customer_id \
     WHERE c.city = 'Mumbai' GROUP BY c.customer_id, c.name, c.city;"
        .to_string()
}

fn revenue_by_city() -> String {
    "SELECT c.city, SUM(o.total_amount) AS total_revenue \
     FROM customers c JOIN orders o ON c.customer_id = o.customer_id \
     GROUP BY c.city ORDER BY total_revenue DESC;"
        .to_string()
}

fn list_customers() -> String {
    "SELECT * FROM customers ORDER BY registration_date DESC;".to_string()
}

fn order_overview() -> String {
    "SELECT o.order_id, o.customer_id, c.name, o.order_date, o.total_amount \
     FROM orders o JOIN customers c ON c.customer_id = o.customer_id \
     ORDER BY o.order_date DESC;"
        .to_string()
}

fn products_by_price() -> String {
    "SELECT * FROM products ORDER BY price DESC;".to_string()
}

fn order_count_by_customer() -> String {
    "SELECT c.customer_id, c.name, COUNT(o.order_id) AS order_count \
     FROM customers c LEFT JOIN orders o ON c.customer_id = o.customer_id \
     GROUP BY c.customer_id, c.name ORDER BY order_count DESC;"
        .to_string()
}

fn projects_by_department() -> String {
    "SELECT p.project_id, p.project_name, d.department_name \
     FROM projects p JOIN departments d ON p.department_id = d.department_id \
     ORDER BY d.department_name, p.project_name;"
        .to_string()
}

fn attendance_summary() -> String {
    "SELECT a.date, a.status, COUNT(*) AS employee_count \
     FROM attendance a GROUP BY a.date, a.status ORDER BY a.date, a.status;"
        .to_string()
}

fn headcount_by_department() -> String {
    "SELECT d.department_name, COUNT(e.employee_id) AS employee_count \
     FROM departments d LEFT JOIN employees e ON e.department_id = d.department_id \
     GROUP BY d.department_id, d.department_name \
     ORDER BY employee_count DESC, d.department_name;"
        .to_string()
}

fn top_earner() -> String {
    "SELECT e.employee_id, e.name, d.department_name, e.salary \
     FROM employees e LEFT JOIN departments d ON e.department_id = d.department_id \
     ORDER BY e.salary DESC LIMIT 1;"
        .to_string()
}

fn employees_by_salary() -> String {
    "SELECT e.employee_id, e.name, d.department_name, e.salary \
     FROM employees e LEFT JOIN departments d ON e.department_id = d.department_id \
     ORDER BY e.salary DESC;"
        .to_string()
}

fn employees_by_hire_date() -> String {
    "SELECT e.employee_id, e.name, e.hire_date, d.department_name \
     FROM employees e LEFT JOIN departments d ON e.department_id = d.department_id \
     ORDER BY e.hire_date DESC;"
        .to_string()
}

fn employees_by_department() -> String {
    "SELECT e.employee_id, e.name, d.department_name, e.salary, e.hire_date \
     FROM employees e LEFT JOIN departments d ON e.department_id = d.department_id \
     ORDER BY d.department_name, e.name;"
        .to_string()
}

fn list_employees() -> String {
    "SELECT * FROM employees ORDER BY name;".to_string()
}

fn list_departments() -> String {
    "SELECT * FROM departments ORDER BY department_name;".to_string()
}

fn default_customers() -> String {
    "SELECT * FROM customers LIMIT 10;".to_string()
}
