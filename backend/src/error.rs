//! Error types for the table transform pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ExpressionError`] - Script tokenizing, parsing and evaluation errors
//! - [`TransformError`] - Transform dispatch and row-merge errors
//! - [`LoadError`] - Reading datasets and panel configs from disk or bytes
//! - [`OutputError`] - Rendering tables as JSON, CSV or text
//! - [`ServerError`] - HTTP API errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Expression Errors
// =============================================================================

/// Errors raised while compiling or running a computed-column script.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExpressionError {
    /// A character the tokenizer does not understand.
    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    /// A string literal without its closing quote.
    #[error("Unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    /// A numeric literal that does not parse.
    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),

    /// The parser found a token it did not expect.
    #[error("Unexpected token {found} at position {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        pos: usize,
    },

    /// The expression ended early.
    #[error("Unexpected end of expression, expected {0}")]
    UnexpectedEnd(String),

    /// A call to a function that is not built in.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// A bare identifier that is not a literal keyword.
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// A built-in function called with the wrong number of arguments.
    #[error("Function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// Expression nesting is deeper than the parser allows.
    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),
}

// =============================================================================
// Transform Errors
// =============================================================================

/// Errors during transform dispatch and execution.
#[derive(Debug, Error)]
pub enum TransformError {
    /// No transformer is registered under the requested identifier.
    #[error("Transformer {0} not found")]
    NotFound(String),

    /// Input datasets do not have the shape the transform requires.
    #[error("Invalid dataset format: {0}")]
    Format(String),

    /// A cell could not be mapped to a column descriptor.
    #[error("Cannot resolve column for dataset {dataset}, row {row}, cell {cell}")]
    Resolution {
        dataset: usize,
        row: usize,
        cell: usize,
    },

    /// A computed-column script failed to evaluate.
    #[error("Script '{script}' failed: {source}")]
    Evaluation {
        script: String,
        #[source]
        source: ExpressionError,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformError {
    /// Coarse category name, used in API error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "configuration",
            Self::Format(_) | Self::Json(_) => "format",
            Self::Resolution { .. } => "resolution",
            Self::Evaluation { .. } => "evaluation",
        }
    }
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while reading datasets or panel configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON or does not deserialize.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Dataset file is not a JSON array.
    #[error("Expected a JSON array of datasets")]
    NotAnArray,

    /// A CSV dataset could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A CSV dataset has no header line.
    #[error("CSV file has no header line")]
    EmptyCsv,

    /// Schema validation failed.
    #[error("Validation failed: {errors:?}")]
    Schema { errors: Vec<String> },

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while rendering a table.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Request payload failed to load or validate.
    #[error("{0}")]
    Load(#[from] LoadError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Failed to bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for expression operations.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for rendering operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
