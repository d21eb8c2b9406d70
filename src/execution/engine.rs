//! Execution Engine Trait - Core contract for statement execution
//!
//! The request service only ever talks to an engine through this trait, so
//! tests can swap in an engine that fails on purpose.

use crate::error::Result;
use crate::models::ExecutionOutcome;
use async_trait::async_trait;

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Engine name (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Run one statement to completion.
    ///
    /// Statement-level failures come back as `QueryError::Execution`; failing
    /// to obtain a connection is `QueryError::Resource`.
    async fn execute(&self, sql: &str) -> Result<ExecutionOutcome>;

    /// Check if the backing store is reachable
    async fn health_check(&self) -> Result<bool>;
}
