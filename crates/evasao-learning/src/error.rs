//! Error types for the evasao-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by every
//! fallible operation in the crate: configuration, training, evaluation,
//! inference and artifact persistence.
//!
//! # Example
//!
//! ```
//! use evasao_learning::{LearningError, PipelineConfig};
//!
//! fn configure() -> Result<PipelineConfig, LearningError> {
//!     // Errors are automatically propagated with ?
//!     let config = PipelineConfig::builder().cv_folds(5).build()?;
//!     Ok(config)
//! }
//! # configure().unwrap();
//! ```

use evasao_data::DataError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for evasao-learning operations.
///
/// Errors are never retried or recovered inside the crate; the training
/// binary treats every one of them as fatal.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the pipeline.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or inference.
    ///
    /// Common causes:
    /// - Predictor columns contain null values
    /// - A class has too few rows for the requested split or folds
    /// - AUC requested on labels with a single class
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A column the model was trained on is absent from the input.
    #[error("Column '{0}' required by the model is missing from the input")]
    MissingColumn(String),

    /// Fitting could not proceed (empty or single-class training set).
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// [`Pipeline::create_trained_model()`](crate::Pipeline::create_trained_model)
    /// was called before a successful `train()`.
    #[error("No trained model available; run train() first")]
    NotTrained,

    /// The model artifact does not exist.
    #[error("Model not found: {path}")]
    ModelNotFound { path: String },

    /// The model artifact exists but cannot be decoded.
    #[error("Corrupt model artifact: {0}")]
    CorruptModel(String),

    /// Error from dataset handling.
    #[error(transparent)]
    Data(#[from] DataError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary artifact encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[from] bitcode::Error),
}

impl LearningError {
    /// Stable error code for API consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::MissingColumn(_) => "MISSING_COLUMN",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::NotTrained => "NOT_TRAINED",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::CorruptModel(_) => "CORRUPT_MODEL",
            Self::Data(inner) => inner.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Encode(_) => "ENCODE_ERROR",
        }
    }

    /// Whether the error concerns the model artifact rather than the input.
    pub fn is_artifact_error(&self) -> bool {
        matches!(self, Self::ModelNotFound { .. } | Self::CorruptModel(_))
    }
}

impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LearningError::InvalidConfig("cv_folds must be at least 2".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: cv_folds must be at least 2"
        );

        let err = LearningError::ModelNotFound {
            path: "modelo_evasao.bin".to_string(),
        };
        assert_eq!(err.to_string(), "Model not found: modelo_evasao.bin");
    }

    #[test]
    fn test_data_error_passthrough() {
        let err: LearningError = DataError::ColumnNotFound("Target".to_string()).into();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.to_string().contains("Target"));
    }

    #[test]
    fn test_is_artifact_error() {
        assert!(LearningError::CorruptModel("bad header".to_string()).is_artifact_error());
        assert!(!LearningError::NotTrained.is_artifact_error());
    }

    #[test]
    fn test_error_serialization() {
        let err = LearningError::MissingColumn("Curso".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "MISSING_COLUMN");
        assert!(json["message"].as_str().unwrap().contains("Curso"));
    }
}
