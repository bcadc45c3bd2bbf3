//! Configuration for the training pipeline.
//!
//! The defaults reproduce the reference training run: 100 trees, seed 42,
//! 5-fold stratified cross-validation and an 80/20 stratified split.
//!
//! # Example
//!
//! ```
//! use evasao_learning::{MaxFeatures, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .n_estimators(200)
//!     .max_features(MaxFeatures::Sqrt)
//!     .cv_folds(10)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.test_size, 0.2);
//! ```

use evasao_data::TARGET_COLUMN;
use serde::{Deserialize, Serialize};

use crate::error::LearningError;
use crate::forest::ForestParams;

/// How many candidate features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`.
    #[default]
    Sqrt,
    /// `floor(log2(n_features))`.
    Log2,
    /// Every feature.
    All,
    /// A fixed count, capped at the number of features.
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` columns (at least 1).
    #[must_use]
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(k) => (*k).min(n_features),
        };
        n.max(1)
    }
}

/// Configuration for the training pipeline.
///
/// Use [`PipelineConfig::builder()`] to construct a validated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the outcome column (default: `"Target"`).
    pub target_column: String,

    /// Number of trees in the forest (default: 100).
    pub n_estimators: usize,

    /// Maximum tree depth; `None` grows trees until leaves are pure (default).
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node (default: 2).
    pub min_samples_split: usize,

    /// Candidate features per split (default: [`MaxFeatures::Sqrt`]).
    pub max_features: MaxFeatures,

    /// Number of stratified cross-validation folds (default: 5).
    pub cv_folds: usize,

    /// Fraction of rows held out for testing (default: 0.2).
    pub test_size: f64,

    /// Seed for every random choice in the pipeline (default: 42).
    pub random_seed: u64,

    /// Train/test AUC gap above which overfitting is reported (default: 0.10).
    pub overfit_gap: f64,

    /// Test AUC below which underfitting is reported (default: 0.70).
    pub underfit_auc: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: TARGET_COLUMN.to_string(),
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::default(),
            cv_folds: 5,
            test_size: 0.2,
            random_seed: 42,
            overfit_gap: 0.10,
            underfit_auc: 0.70,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// The forest hyperparameters carried by this configuration.
    #[must_use]
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: self.max_features,
            random_seed: self.random_seed,
        }
    }
}

/// Builder for [`PipelineConfig`].
///
/// Created via [`PipelineConfig::builder()`]. All setters return `self` to allow
/// method chaining; validation happens in [`build()`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the outcome column name.
    #[must_use]
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.config.target_column = column.into();
        self
    }

    /// Set the number of trees (default: 100).
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    /// Limit tree depth (default: unlimited).
    #[must_use]
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the minimum samples needed to split a node (default: 2).
    #[must_use]
    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.config.min_samples_split = n;
        self
    }

    /// Set the number of candidate features per split.
    #[must_use]
    pub fn max_features(mut self, max_features: MaxFeatures) -> Self {
        self.config.max_features = max_features;
        self
    }

    /// Set the number of cross-validation folds (default: 5).
    #[must_use]
    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.config.cv_folds = folds;
        self
    }

    /// Set the held-out fraction (default: 0.2).
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    /// Set the random seed (default: 42).
    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    /// Set the overfitting gap threshold (default: 0.10).
    #[must_use]
    pub fn overfit_gap(mut self, gap: f64) -> Self {
        self.config.overfit_gap = gap;
        self
    }

    /// Set the underfitting AUC threshold (default: 0.70).
    #[must_use]
    pub fn underfit_auc(mut self, auc: f64) -> Self {
        self.config.underfit_auc = auc;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if:
    /// - `target_column` is empty
    /// - `test_size` is not in range `(0.0, 1.0)`
    /// - `cv_folds` is less than 2
    /// - `n_estimators` is 0
    /// - `min_samples_split` is less than 2
    /// - `max_depth` is `Some(0)`
    /// - `overfit_gap` or `underfit_auc` is outside `[0.0, 1.0]`
    pub fn build(self) -> Result<PipelineConfig, LearningError> {
        let config = self.config;

        if config.target_column.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "target_column must not be empty".to_string(),
            ));
        }

        if !(config.test_size > 0.0 && config.test_size < 1.0) {
            return Err(LearningError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if config.cv_folds < 2 {
            return Err(LearningError::InvalidConfig(
                "cv_folds must be at least 2".to_string(),
            ));
        }

        if config.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        if config.min_samples_split < 2 {
            return Err(LearningError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }

        if config.max_depth == Some(0) {
            return Err(LearningError::InvalidConfig(
                "max_depth must be at least 1 when set".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&config.overfit_gap) {
            return Err(LearningError::InvalidConfig(
                "overfit_gap must be within [0.0, 1.0]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&config.underfit_auc) {
            return Err(LearningError::InvalidConfig(
                "underfit_auc must be within [0.0, 1.0]".to_string(),
            ));
        }

        if let MaxFeatures::Fixed(0) = config.max_features {
            return Err(LearningError::InvalidConfig(
                "max_features must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_column, "Target");
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.max_depth, None);
        assert_eq!(config.min_samples_split, 2);
        assert_eq!(config.max_features, MaxFeatures::Sqrt);
        assert!((config.overfit_gap - 0.10).abs() < f64::EPSILON);
        assert!((config.underfit_auc - 0.70).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builder_chaining() {
        let config = PipelineConfig::builder()
            .target_column("Outcome")
            .n_estimators(10)
            .max_depth(Some(8))
            .min_samples_split(4)
            .max_features(MaxFeatures::Fixed(3))
            .cv_folds(3)
            .test_size(0.25)
            .random_seed(7)
            .overfit_gap(0.05)
            .underfit_auc(0.6)
            .build()
            .unwrap();

        assert_eq!(config.target_column, "Outcome");
        assert_eq!(config.n_estimators, 10);
        assert_eq!(config.max_depth, Some(8));
        assert_eq!(config.min_samples_split, 4);
        assert_eq!(config.max_features, MaxFeatures::Fixed(3));
        assert_eq!(config.cv_folds, 3);
        assert!((config.test_size - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.random_seed, 7);
    }

    #[test]
    fn test_invalid_test_size() {
        for size in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let err = PipelineConfig::builder().test_size(size).build().unwrap_err();
            assert!(err.to_string().contains("test_size"));
        }
    }

    #[test]
    fn test_invalid_cv_folds() {
        let err = PipelineConfig::builder().cv_folds(1).build().unwrap_err();
        assert!(err.to_string().contains("cv_folds"));
    }

    #[test]
    fn test_invalid_forest_params() {
        let err = PipelineConfig::builder().n_estimators(0).build().unwrap_err();
        assert!(err.to_string().contains("n_estimators"));

        let err = PipelineConfig::builder().min_samples_split(1).build().unwrap_err();
        assert!(err.to_string().contains("min_samples_split"));

        let err = PipelineConfig::builder().max_depth(Some(0)).build().unwrap_err();
        assert!(err.to_string().contains("max_depth"));

        let err = PipelineConfig::builder()
            .max_features(MaxFeatures::Fixed(0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_features"));
    }

    #[test]
    fn test_invalid_thresholds() {
        let err = PipelineConfig::builder().overfit_gap(1.5).build().unwrap_err();
        assert!(err.to_string().contains("overfit_gap"));

        let err = PipelineConfig::builder().underfit_auc(-0.1).build().unwrap_err();
        assert!(err.to_string().contains("underfit_auc"));
    }

    #[test]
    fn test_empty_target_column() {
        let err = PipelineConfig::builder().target_column("  ").build().unwrap_err();
        assert!(err.to_string().contains("target_column"));
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(100), 10);
        assert_eq!(MaxFeatures::Sqrt.resolve(90), 9);
        assert_eq!(MaxFeatures::Log2.resolve(64), 6);
        assert_eq!(MaxFeatures::All.resolve(12), 12);
        assert_eq!(MaxFeatures::Fixed(50).resolve(12), 12);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
    }

    #[test]
    fn test_forest_params_follow_config() {
        let config = PipelineConfig::builder()
            .n_estimators(7)
            .random_seed(3)
            .build()
            .unwrap();
        let params = config.forest_params();
        assert_eq!(params.n_estimators, 7);
        assert_eq!(params.random_seed, 3);
        assert_eq!(params.min_samples_split, 2);
    }
}
