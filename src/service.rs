//! Request Service
//!
//! Composition root for the pipeline: translate, optionally execute, time each
//! phase and assemble a response. Generate and execute always produce a
//! response object; only resource and introspection faults are reported as
//! failures of the call itself.

use crate::error::{ErrorKind, QueryError, Result};
use crate::execution::{ExecutionEngine, SqliteEngine};
use crate::models::{ExecutionOutcome, Question, SchemaDescriptor, TimedResult, Translation};
use crate::schema::SchemaIntrospector;
use crate::translator::{default_rules, RuleSummary, RuleTable, Translator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds
    pub elapsed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseTimings {
    pub generation: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    /// The statement that was attempted, kept even when it failed
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ExecutionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds, from entry to response assembly
    pub elapsed: f64,
    pub timings: PhaseTimings,
    #[serde(skip)]
    pub error_kind: Option<ErrorKind>,
}

impl ExecuteResponse {
    /// True when the failure should fail the whole request at the transport.
    pub fn is_fatal(&self) -> bool {
        self.error_kind.map(ErrorKind::is_fatal).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaResponse {
    pub schema: SchemaDescriptor,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub healthy: bool,
    pub classifier_ready: bool,
    pub engine: &'static str,
    pub rules: usize,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub struct QueryService {
    translator: Translator,
    engine: Arc<dyn ExecutionEngine>,
    introspector: SchemaIntrospector,
    classifier_ready: bool,
}

impl QueryService {
    pub fn new(
        rules: Arc<RuleTable>,
        engine: Arc<dyn ExecutionEngine>,
        introspector: SchemaIntrospector,
    ) -> Self {
        // Checked once; the table never changes afterwards.
        let verified = panic::catch_unwind(AssertUnwindSafe(|| rules.verify()))
            .unwrap_or_else(|payload| Err(QueryError::Translation(panic_message(payload.as_ref()))));
        let classifier_ready = match verified {
            Ok(()) => {
                info!(rules = rules.len(), "Rule table verified");
                true
            }
            Err(e) => {
                warn!("Rule table failed verification: {}", e);
                false
            }
        };

        Self {
            translator: Translator::new(rules),
            engine,
            introspector,
            classifier_ready,
        }
    }

    /// Default rule table over a SQLite pool.
    pub fn from_pool(pool: SqlitePool, echo_sql: bool) -> Self {
        let engine = SqliteEngine::new(pool.clone()).with_echo(echo_sql);
        Self::new(
            default_rules(),
            Arc::new(engine),
            SchemaIntrospector::new(pool),
        )
    }

    pub fn classifier_ready(&self) -> bool {
        self.classifier_ready
    }

    pub fn rules(&self) -> Vec<RuleSummary> {
        self.translator.rules().summaries()
    }

    /// Translate only.
    pub fn generate(&self, question: &Question) -> GenerateResponse {
        let span = info_span!("generate", request_id = %Uuid::new_v4());
        let _entered = span.enter();

        let timed = TimedResult::measure(|| self.translate_guarded(question));
        let elapsed = timed.seconds();
        match timed.value {
            Ok(translation) => {
                info!(rule = translation.rule_id, elapsed, "SQL generated");
                GenerateResponse {
                    sql: translation.sql,
                    rule_id: Some(translation.rule_id),
                    error: None,
                    elapsed,
                }
            }
            Err(e) => {
                error!("{}", e);
                GenerateResponse {
                    sql: String::new(),
                    rule_id: None,
                    error: Some(e.to_string()),
                    elapsed,
                }
            }
        }
    }

    /// Translate, then run the statement.
    pub async fn execute(&self, question: &Question) -> ExecuteResponse {
        let span = info_span!("execute", request_id = %Uuid::new_v4());
        self.execute_inner(question).instrument(span).await
    }

    async fn execute_inner(&self, question: &Question) -> ExecuteResponse {
        let start = Instant::now();

        let generated = TimedResult::measure(|| self.translate_guarded(question));
        let generation = generated.seconds();
        let translation = match generated.value {
            Ok(translation) => translation,
            Err(e) => {
                error!("{}", e);
                return ExecuteResponse {
                    sql: String::new(),
                    rule_id: None,
                    results: None,
                    error: Some(e.to_string()),
                    elapsed: start.elapsed().as_secs_f64(),
                    timings: PhaseTimings {
                        generation,
                        execution: None,
                    },
                    error_kind: Some(e.kind()),
                };
            }
        };

        let executed = TimedResult::measure_async(self.engine.execute(&translation.sql)).await;
        let timings = PhaseTimings {
            generation,
            execution: Some(executed.seconds()),
        };

        match executed.value {
            Ok(outcome) => {
                info!(
                    rule = translation.rule_id,
                    rows = outcome.rows().map(|r| r.len()),
                    rows_affected = outcome.rows_affected(),
                    "Query executed"
                );
                ExecuteResponse {
                    sql: translation.sql,
                    rule_id: Some(translation.rule_id),
                    results: Some(outcome),
                    error: None,
                    elapsed: start.elapsed().as_secs_f64(),
                    timings,
                    error_kind: None,
                }
            }
            Err(e) => {
                if e.kind().is_fatal() {
                    error!(rule = translation.rule_id, "{}", e);
                } else {
                    warn!(rule = translation.rule_id, "{}", e);
                }
                ExecuteResponse {
                    sql: translation.sql,
                    rule_id: Some(translation.rule_id),
                    results: None,
                    error: Some(e.to_string()),
                    elapsed: start.elapsed().as_secs_f64(),
                    timings,
                    error_kind: Some(e.kind()),
                }
            }
        }
    }

    pub async fn schema(&self) -> Result<SchemaResponse> {
        let schema = self.introspector.describe().await?;
        Ok(SchemaResponse { schema })
    }

    pub async fn status(&self) -> StatusResponse {
        let healthy = match self.engine.health_check().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        };

        StatusResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            healthy,
            classifier_ready: self.classifier_ready,
            engine: self.engine.name(),
            rules: self.translator.rules().len(),
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        }
    }

    /// Templates are plain functions and cannot fail, but a panicking one must
    /// not take the request down with it.
    fn translate_guarded(&self, question: &Question) -> Result<Translation> {
        panic::catch_unwind(AssertUnwindSafe(|| self.translator.translate(question)))
            .map_err(|payload| QueryError::Translation(panic_message(payload.as_ref())))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "template panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::{Predicate, Rule};
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;

    struct ExhaustedEngine;

    #[async_trait]
    impl ExecutionEngine for ExhaustedEngine {
        fn name(&self) -> &'static str {
            "exhausted"
        }

        async fn execute(&self, _sql: &str) -> Result<ExecutionOutcome> {
            Err(QueryError::Resource("pool timed out".to_string()))
        }

        async fn health_check(&self) -> Result<bool> {
            Err(QueryError::Resource("pool timed out".to_string()))
        }
    }

    fn exploding() -> String {
        panic!("template exploded")
    }

    fn fine() -> String {
        "SELECT 1;".to_string()
    }

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_panicking_template_becomes_error_response() {
        let table = RuleTable::builder()
            .rule(Rule::new("boom", Predicate::contains("boom"), exploding))
            .fallback(Rule::fallback("fine", fine));
        let pool = memory_pool().await;
        let service = QueryService::new(
            Arc::new(table),
            Arc::new(SqliteEngine::new(pool.clone())),
            SchemaIntrospector::new(pool),
        );
        // Rendering a panicking template during verification is caught too.
        assert!(!service.classifier_ready());

        let response = service.generate(&Question::new("boom"));
        assert_eq!(response.sql, "");
        assert!(response.error.unwrap().contains("template exploded"));

        let response = service.execute(&Question::new("boom")).await;
        assert!(response.results.is_none());
        assert_eq!(response.error_kind, Some(ErrorKind::Translation));
        assert!(!response.is_fatal());

        assert_eq!(service.generate(&Question::new("calm")).sql, "SELECT 1;");
    }

    #[tokio::test]
    async fn test_resource_fault_keeps_sql_and_is_fatal() {
        let pool = memory_pool().await;
        let service = QueryService::new(
            default_rules(),
            Arc::new(ExhaustedEngine),
            SchemaIntrospector::new(pool),
        );

        let response = service.execute(&Question::new("Show all customers")).await;
        assert!(response.sql.starts_with("SELECT * FROM customers"));
        assert!(response.is_fatal());
        assert!(response.timings.execution.is_some());

        let status = service.status().await;
        assert!(!status.healthy);
        assert!(status.classifier_ready);
        assert_eq!(status.engine, "exhausted");
    }

    #[tokio::test]
    async fn test_generate_reports_rule_and_timing() {
        let service = QueryService::from_pool(memory_pool().await, false);
        let response = service.generate(&Question::new("total revenue by city"));
        assert_eq!(response.rule_id, Some("revenue_by_city"));
        assert!(response.error.is_none());
        assert!(response.elapsed >= 0.0);
    }
}
