//! Progress reporting types for the training pipeline.
//!
//! The pipeline reports a [`ProgressUpdate`] at the start of every
//! [`TrainingStage`] and after each cross-validation fold, through an
//! optional [`ProgressCallback`].
//!
//! # Example
//!
//! ```
//! use evasao_learning::{Pipeline, PipelineConfig, ProgressUpdate};
//!
//! let pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .on_progress(|update: ProgressUpdate| {
//!         println!(
//!             "[{}] {:.0}% - {}",
//!             update.stage,
//!             update.progress * 100.0,
//!             update.message
//!         );
//!     })
//!     .build();
//! assert!(pipeline.is_ok());
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The current stage of the training pipeline.
///
/// Training progresses through these stages in order:
///
/// 1. [`Initializing`](Self::Initializing) - Validating the input frame
/// 2. [`Filtering`](Self::Filtering) - Dropping rows with other outcomes
/// 3. [`Preprocessing`](Self::Preprocessing) - Column typing and the train/test split
/// 4. [`CrossValidation`](Self::CrossValidation) - Stratified k-fold AUC
/// 5. [`Training`](Self::Training) - Fitting on the full training split
/// 6. [`Evaluation`](Self::Evaluation) - Test metrics and fit diagnosis
/// 7. [`Complete`](Self::Complete) - Training finished successfully
///
/// Terminal states: [`Complete`](Self::Complete), [`Failed`](Self::Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TrainingStage {
    /// Pipeline is initializing.
    #[default]
    Initializing,

    /// Rows whose outcome is neither dropout nor graduate are removed.
    Filtering,

    /// Predictor columns are typed and split into train and test sets.
    Preprocessing,

    /// Cross-validation folds are being scored.
    CrossValidation,

    /// The final forest is being fitted on the training split.
    Training,

    /// Held-out metrics are being computed.
    Evaluation,

    /// Training completed successfully.
    Complete,

    /// Training failed. The error is returned from `train()`.
    Failed,
}

const ALL_STAGES: [TrainingStage; 8] = [
    TrainingStage::Initializing,
    TrainingStage::Filtering,
    TrainingStage::Preprocessing,
    TrainingStage::CrossValidation,
    TrainingStage::Training,
    TrainingStage::Evaluation,
    TrainingStage::Complete,
    TrainingStage::Failed,
];

impl TrainingStage {
    /// Returns the snake_case name of the stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use evasao_learning::TrainingStage;
    ///
    /// assert_eq!(TrainingStage::CrossValidation.as_str(), "cross_validation");
    /// ```
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStage::Initializing => "initializing",
            TrainingStage::Filtering => "filtering",
            TrainingStage::Preprocessing => "preprocessing",
            TrainingStage::CrossValidation => "cross_validation",
            TrainingStage::Training => "training",
            TrainingStage::Evaluation => "evaluation",
            TrainingStage::Complete => "complete",
            TrainingStage::Failed => "failed",
        }
    }

    /// Returns `true` for [`Complete`](Self::Complete) and [`Failed`](Self::Failed).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingStage::Complete | TrainingStage::Failed)
    }
}

impl fmt::Display for TrainingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a [`TrainingStage`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTrainingStageError {
    invalid_value: String,
}

impl ParseTrainingStageError {
    /// Returns the invalid value that caused the parse error.
    #[must_use]
    pub fn invalid_value(&self) -> &str {
        &self.invalid_value
    }
}

impl fmt::Display for ParseTrainingStageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid: Vec<&str> = ALL_STAGES.iter().map(TrainingStage::as_str).collect();
        write!(
            f,
            "invalid training stage: '{}'. Valid values are: {}",
            self.invalid_value,
            valid.join(", ")
        )
    }
}

impl std::error::Error for ParseTrainingStageError {}

impl FromStr for TrainingStage {
    type Err = ParseTrainingStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_STAGES
            .iter()
            .copied()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| ParseTrainingStageError {
                invalid_value: s.to_string(),
            })
    }
}

/// A progress update from the training pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressUpdate {
    /// The current training stage.
    pub stage: TrainingStage,

    /// Overall progress from 0.0 to 1.0, non-decreasing during a run.
    pub progress: f64,

    /// Human-readable status message.
    pub message: String,

    /// Cross-validation folds finished so far: `(completed, total)`.
    ///
    /// Only populated during [`CrossValidation`](TrainingStage::CrossValidation).
    pub folds_completed: Option<(usize, usize)>,
}

impl ProgressUpdate {
    /// Create an update for `stage` without fold information.
    pub fn new(stage: TrainingStage, progress: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress,
            message: message.into(),
            folds_completed: None,
        }
    }
}

/// Type alias for a progress callback function.
///
/// Callbacks must be thread-safe (`Send + Sync`) and should return quickly;
/// they run inline with training.
pub type ProgressCallback = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
