//! Common types returned by the training pipeline and the model.
//!
//! - [`TrainingResult`]: complete result from [`Pipeline::train()`](crate::Pipeline::train)
//! - [`Metrics`]: cross-validation, train and test AUC
//! - [`PredictionResult`]: result from [`TrainedModel::predict_record()`](crate::TrainedModel::predict_record)
//! - [`ModelInfo`]: metadata stored inside the model artifact

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnosis::FitDiagnosis;
use crate::metrics::{ClassificationReport, ConfusionMatrix};

/// Result of a training pipeline run.
///
/// Serializes to JSON for the `--report` option of `evasao-train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingResult {
    /// Rows in the input frame.
    pub rows_loaded: usize,

    /// Rows left after dropping outcomes other than dropout and graduate.
    pub rows_kept: usize,

    /// Rows in the training split.
    pub train_size: usize,

    /// Rows in the held-out test split.
    pub test_size: usize,

    /// AUC scores and summaries.
    pub metrics: Metrics,

    /// Test-set confusion matrix.
    pub confusion_matrix: ConfusionMatrix,

    /// Test-set classification report.
    pub classification_report: ClassificationReport,

    /// Over/underfitting heuristic.
    pub diagnosis: FitDiagnosis,

    /// Feature importance scores (feature name, importance), descending.
    ///
    /// Names are the transformed feature names, so each category of a
    /// categorical column has its own entry.
    pub feature_importance: Vec<(String, f64)>,

    /// Total training time in seconds.
    pub training_time_seconds: f64,

    /// Non-fatal issues, such as predictor columns of unsupported types.
    pub warnings: Vec<String>,
}

/// AUC-ROC figures from a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// AUC of each cross-validation fold, in fold order.
    pub cv_auc_scores: Vec<f64>,

    /// Mean of `cv_auc_scores`.
    pub cv_auc_mean: f64,

    /// Population standard deviation of `cv_auc_scores`.
    pub cv_auc_std: f64,

    /// AUC of the final model on its own training split.
    pub train_auc: f64,

    /// AUC of the final model on the held-out test split.
    pub test_auc: f64,

    /// Test-set accuracy.
    pub accuracy: f64,
}

/// Result of scoring one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class: 1 for dropout, 0 for graduate.
    pub class: u8,

    /// `"Desistente"` or `"Graduado"`.
    pub label: String,

    /// Probability of the dropout class, in `[0, 1]`.
    pub dropout_probability: f64,
}

/// Metadata about a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Classifier name, `"random_forest"`.
    pub algorithm: String,

    /// When training finished.
    pub trained_at: DateTime<Utc>,

    /// Outcome column the model was trained on.
    pub target_column: String,

    /// Raw numeric predictor columns, in training order.
    pub numeric_features: Vec<String>,

    /// Raw categorical predictor columns, in training order.
    pub categorical_features: Vec<String>,

    pub n_estimators: usize,

    pub random_seed: u64,

    /// Rows the final model was fitted on.
    pub n_training_rows: usize,

    /// Held-out AUC at training time.
    pub test_auc: f64,
}
