//! Error types for the Steamload pipeline.
//!
//! Every stage has its own error enum:
//!
//! - [`SourceError`] - reading and decoding the input files
//! - [`TransformError`] - schema checks, cleaning and merging
//! - [`SinkError`] - connecting to and writing the destination table
//! - [`ConfigError`] - invalid connection target at startup
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Conversion into [`PipelineError`] is automatic via `From`, so `?` works
//! across stage boundaries. Every error is fatal for the run.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while reading a source file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be opened or read.
    #[error("Cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed delimited data.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: u64, message: String },

    /// Malformed JSON document.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The file contains no data at all.
    #[error("Source file is empty")]
    Empty,

    /// The delimited file has no usable header line.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// The JSON document is neither an array of records nor a single record.
    #[error("Unsupported JSON shape: expected an array of objects or an object, found {0}")]
    UnsupportedShape(String),
}

impl From<csv::Error> for SourceError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        SourceError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised while validating, cleaning or merging tables.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A required column is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A raw record does not match the expected source schema.
    #[error("Record {record} has unexpected types: {}", errors.join("; "))]
    TypeMismatch { record: usize, errors: Vec<String> },

    /// A cleaning operation rejected a cell.
    #[error("Row {row}: {operation} failed on column '{column}' (value '{value}')")]
    Cleaning {
        column: String,
        row: usize,
        operation: &'static str,
        value: String,
    },

    /// A price value could not be coerced to a number.
    #[error("Row {row}: price '{value}' is not numeric")]
    NonNumericPrice { row: usize, value: String },

    /// A join key occurs more than once on the structured side.
    #[error("Duplicate join key '{0}' in structured source")]
    DuplicateKey(String),

    /// A description does not start with the expected boilerplate.
    #[error("Row {row}: description does not start with '{expected}'")]
    DescriptionPrefix { row: usize, expected: String },
}

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors from the destination store.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Connection could not be established.
    #[error("Cannot connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// A statement failed while replacing the table.
    #[error("Failed to write table '{table}': {message}")]
    Write { table: String, message: String },
}

impl SinkError {
    pub(crate) fn write(table: &str, message: impl ToString) -> Self {
        SinkError::Write {
            table: table.to_string(),
            message: message.to_string(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in the connection target, detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Host is empty.
    #[error("Database host must not be empty")]
    EmptyHost,

    /// Port is zero.
    #[error("Database port must be greater than zero")]
    InvalidPort,

    /// Identifier is not a plain SQL identifier.
    #[error("Invalid {kind} name '{value}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier { kind: &'static str, value: String },

    /// Environment override could not be parsed.
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source reading error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Sink error.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
