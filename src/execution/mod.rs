//! Query Executor
//!
//! Runs generated statements against the live store under the correct
//! read/write semantics.

pub mod engine;
pub mod rows;
pub mod sqlite_engine;

pub use engine::ExecutionEngine;
pub use sqlite_engine::SqliteEngine;
