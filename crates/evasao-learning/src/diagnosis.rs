//! Over/underfitting heuristic from train and test AUC.
//!
//! The diagnosis is informational only; it never changes what is trained.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

/// Thresholds used by [`FitDiagnosis::assess`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitThresholds {
    /// Train minus test AUC above which the model is considered overfit.
    pub overfit_gap: f64,
    /// Test AUC below which the model is considered underfit.
    pub underfit_auc: f64,
}

impl Default for FitThresholds {
    fn default() -> Self {
        Self {
            overfit_gap: 0.10,
            underfit_auc: 0.70,
        }
    }
}

impl From<&PipelineConfig> for FitThresholds {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            overfit_gap: config.overfit_gap,
            underfit_auc: config.underfit_auc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitDiagnosis {
    Overfitting,
    Underfitting,
    Balanced,
}

impl FitDiagnosis {
    /// Classify a train/test AUC pair.
    ///
    /// Overfitting when `train - test > overfit_gap`; otherwise underfitting
    /// when `test < underfit_auc`; otherwise balanced.
    ///
    /// ```
    /// use evasao_learning::{FitDiagnosis, FitThresholds};
    ///
    /// let t = FitThresholds::default();
    /// assert_eq!(FitDiagnosis::assess(1.0, 0.85, &t), FitDiagnosis::Overfitting);
    /// assert_eq!(FitDiagnosis::assess(0.68, 0.65, &t), FitDiagnosis::Underfitting);
    /// assert_eq!(FitDiagnosis::assess(0.93, 0.90, &t), FitDiagnosis::Balanced);
    /// ```
    #[must_use]
    pub fn assess(train_auc: f64, test_auc: f64, thresholds: &FitThresholds) -> Self {
        if train_auc - test_auc > thresholds.overfit_gap {
            FitDiagnosis::Overfitting
        } else if test_auc < thresholds.underfit_auc {
            FitDiagnosis::Underfitting
        } else {
            FitDiagnosis::Balanced
        }
    }

    /// Operator-facing notice.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            FitDiagnosis::Overfitting => "Possível overfitting detectado.",
            FitDiagnosis::Underfitting => "Possível underfitting detectado.",
            FitDiagnosis::Balanced => "Modelo equilibrado.",
        }
    }
}

impl fmt::Display for FitDiagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
