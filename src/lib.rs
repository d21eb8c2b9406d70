pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod export;
pub mod logging;
pub mod models;
pub mod schema;
pub mod server;
pub mod service;
pub mod statement;
pub mod translator;

pub use error::{ErrorKind, QueryError, Result};
pub use models::{ExecutionOutcome, Question, Translation};
pub use service::QueryService;
