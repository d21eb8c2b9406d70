use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Internal fault while building SQL. Never caused by the question itself.
    #[error("Translation fault: {0}")]
    Translation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Introspection error: {0}")]
    Introspection(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Coarse classification of a [`QueryError`], used by the transport layer to
/// decide between "report as data" and "fail the request".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Translation,
    Execution,
    Introspection,
    Resource,
    InvalidStatement,
    Config,
    Internal,
}

impl ErrorKind {
    /// Fatal faults block the whole operation and surface as a failure response.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Resource | ErrorKind::Introspection)
    }
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Translation(_) => ErrorKind::Translation,
            QueryError::Execution(_) => ErrorKind::Execution,
            QueryError::Introspection(_) => ErrorKind::Introspection,
            QueryError::Resource(_) => ErrorKind::Resource,
            QueryError::InvalidStatement(_) => ErrorKind::InvalidStatement,
            QueryError::Config(_) => ErrorKind::Config,
            QueryError::Io(_) | QueryError::Json(_) | QueryError::Csv(_) => ErrorKind::Internal,
        }
    }

    /// Map a failure to obtain a pooled connection.
    pub(crate) fn from_acquire(err: sqlx::Error) -> Self {
        QueryError::Resource(format!("Failed to acquire connection: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
