use axum::http::StatusCode;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Index-level operation that the engine rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOperation {
    Exists,
    Delete,
    Create,
}

impl fmt::Display for SchemaOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaOperation::Exists => write!(f, "exists check"),
            SchemaOperation::Delete => write!(f, "delete"),
            SchemaOperation::Create => write!(f, "create"),
        }
    }
}

/// Point in an import run where a write was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    /// 1-based batch number
    Batch(usize),
    FinalRefresh,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStage::Batch(n) => write!(f, "batch {}", n),
            ImportStage::FinalRefresh => write!(f, "final refresh"),
        }
    }
}

/// Read operation exposed over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperation {
    Facets,
    Autocomplete,
    Search,
}

impl QueryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperation::Facets => "facets",
            QueryOperation::Autocomplete => "autocomplete",
            QueryOperation::Search => "search",
        }
    }
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error types
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Health check failed or the engine could not be reached
    #[error("Search engine is not accessible: {reason}")]
    EngineUnreachable { reason: String },

    /// Index delete/create rejected
    #[error("Index {operation} failed for '{index}': {reason}")]
    SchemaOperationFailed {
        operation: SchemaOperation,
        index: String,
        reason: String,
    },

    /// A bulk write or refresh was rejected
    #[error("Import failed at {stage}: {reason}")]
    ImportBatchFailed { stage: ImportStage, reason: String },

    /// Dataset file missing or malformed
    #[error("Dataset {} could not be read: {reason}", .path.display())]
    DatasetUnreadable { path: PathBuf, reason: String },

    /// A facet/search/autocomplete request was rejected
    #[error("{operation} query failed: {reason}")]
    QueryFailed {
        operation: QueryOperation,
        reason: String,
    },

    /// Every initialization attempt failed
    #[error("Initialization failed after {attempts} attempts: {last_error}")]
    InitializationExhausted { attempts: u32, last_error: String },

    /// Initialization task ended without a result (panicked or cancelled)
    #[error("Initialization aborted: {0}")]
    InitializationAborted(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::EngineUnreachable { .. }
            | AppError::SchemaOperationFailed { .. }
            | AppError::ImportBatchFailed { .. }
            | AppError::DatasetUnreadable { .. }
            | AppError::QueryFailed { .. }
            | AppError::InitializationExhausted { .. }
            | AppError::InitializationAborted(_)
            | AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::EngineUnreachable { .. } => "ENGINE_UNREACHABLE",
            AppError::SchemaOperationFailed { .. } => "SCHEMA_OPERATION_FAILED",
            AppError::ImportBatchFailed { .. } => "IMPORT_BATCH_FAILED",
            AppError::DatasetUnreadable { .. } => "DATASET_UNREADABLE",
            AppError::QueryFailed { .. } => "QUERY_FAILED",
            AppError::InitializationExhausted { .. } => "INITIALIZATION_EXHAUSTED",
            AppError::InitializationAborted(_) => "INITIALIZATION_ABORTED",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    pub(crate) fn unreachable(reason: impl Into<String>) -> Self {
        AppError::EngineUnreachable {
            reason: reason.into(),
        }
    }

    pub(crate) fn query(operation: QueryOperation, reason: impl fmt::Display) -> Self {
        AppError::QueryFailed {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
