//! Error types for student data handling.
//!
//! Errors are serializable so the web layer can hand them to the browser
//! as `{ "code": ..., "message": ... }` objects.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for dataset and record operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The dataset file extension is not one we can read.
    #[error("Unsupported dataset format: {0} (expected .csv, .parquet or .xlsx)")]
    UnsupportedFormat(String),

    /// A workbook could not be opened or its first sheet read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// A target value outside the two known classes reached label mapping.
    #[error("Unexpected target value '{0}' (expected 'Desistente' or 'Graduado')")]
    InvalidLabel(String),

    /// A record field violates its declared domain.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DataError>,
    },
}

impl DataError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DataError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for API consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Spreadsheet(_) => "SPREADSHEET_ERROR",
            Self::InvalidLabel(_) => "INVALID_LABEL",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by user input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::InvalidField { .. } => true,
            Self::WithContext { source, .. } => source.is_user_error(),
            _ => false,
        }
    }
}

impl Serialize for DataError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("DataError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| DataError::Polars(e).with_context(context))
    }
}
