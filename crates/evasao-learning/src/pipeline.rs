//! Training pipeline implementation.
//!
//! [`Pipeline::train()`] runs the full dropout training procedure on a
//! labeled DataFrame:
//!
//! 1. **Filtering** - keep only rows whose outcome is `Desistente` or `Graduado`
//! 2. **Preprocessing** - encode the label, type the predictor columns, and
//!    split rows 80/20 stratified by label
//! 3. **Cross-validation** - stratified k-fold AUC on the training split
//! 4. **Training** - fit scaler, encoder and forest on the whole training split
//! 5. **Evaluation** - test AUC, confusion matrix, classification report,
//!    train AUC and the fit diagnosis
//!
//! Every random choice is derived from [`PipelineConfig::random_seed`], so two
//! runs on the same data produce identical results.
//!
//! # Example
//!
//! ```rust,ignore
//! use evasao_learning::{Pipeline, PipelineConfig};
//!
//! let df = evasao_data::load_dataset("dados/StudentsPrepared.csv")?;
//!
//! let mut pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .on_progress(|update| {
//!         println!("[{}] {:.0}% - {}", update.stage, update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//!
//! let result = pipeline.train(&df)?;
//! println!("Test AUC: {:.4}", result.metrics.test_auc);
//!
//! let model = pipeline.create_trained_model()?;
//! model.save("modelo_evasao.bin")?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use evasao_data::{column_typing, filter_target, split_predictors};
use polars::prelude::DataFrame;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::diagnosis::{FitDiagnosis, FitThresholds};
use crate::error::{LearningError, Result};
use crate::features::{ColumnLayout, FeatureTable};
use crate::metrics::{ClassificationReport, ConfusionMatrix, mean_std, roc_auc};
use crate::model::{FittedPipeline, TrainedModel};
use crate::progress::{ProgressCallback, ProgressUpdate, TrainingStage};
use crate::types::{Metrics, ModelInfo, TrainingResult};
use crate::validation::{StratifiedKFold, stratified_train_test_split};

const ALGORITHM: &str = "random_forest";

/// The dropout training pipeline.
///
/// Use [`Pipeline::builder()`] to construct one.
///
/// # Lifecycle
///
/// 1. Create a pipeline with [`Pipeline::builder()`]
/// 2. Call [`train()`](Self::train) with your data
/// 3. Call [`create_trained_model()`](Self::create_trained_model) to get a model for inference
pub struct Pipeline {
    config: PipelineConfig,
    progress_callback: Option<ProgressCallback>,
    last_model: Option<TrainedModel>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("trained", &self.last_model.is_some())
            .finish()
    }
}

/// Forwards stage changes to the callback and remembers the last progress.
struct Reporter<'a> {
    callback: Option<&'a ProgressCallback>,
    progress: f64,
}

impl Reporter<'_> {
    fn send(&mut self, update: ProgressUpdate) {
        self.progress = update.progress;
        debug!(
            stage = %update.stage,
            progress = update.progress,
            "{}",
            update.message
        );
        if let Some(callback) = self.callback {
            callback(update);
        }
    }

    fn stage(&mut self, stage: TrainingStage, progress: f64, message: impl Into<String>) {
        self.send(ProgressUpdate::new(stage, progress, message));
    }
}

impl Pipeline {
    /// Create a new builder for `Pipeline`.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run the training pipeline on `df`.
    ///
    /// `df` must hold the target column and the predictor columns. Numeric,
    /// boolean and text columns are used; columns of other types are skipped
    /// with a warning.
    ///
    /// # Errors
    ///
    /// - [`Data`](LearningError::Data): the target column is missing
    /// - [`InvalidData`](LearningError::InvalidData): nulls in predictors, too few
    ///   rows for the split or the folds, or a single-class split
    /// - [`TrainingFailed`](LearningError::TrainingFailed): no usable rows or columns
    ///
    /// A [`Failed`](TrainingStage::Failed) update is reported before the error
    /// is returned.
    pub fn train(&mut self, df: &DataFrame) -> Result<TrainingResult> {
        let mut reporter = Reporter {
            callback: self.progress_callback.as_ref(),
            progress: 0.0,
        };

        match run(&self.config, df, &mut reporter) {
            Ok((result, model)) => {
                self.last_model = Some(model);
                Ok(result)
            }
            Err(err) => {
                error!(code = err.error_code(), "Training failed: {err}");
                let progress = reporter.progress;
                reporter.stage(TrainingStage::Failed, progress, err.to_string());
                Err(err)
            }
        }
    }

    /// The model fitted by the last successful [`train()`](Self::train).
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::NotTrained`] before a successful `train()`.
    pub fn create_trained_model(&self) -> Result<TrainedModel> {
        self.last_model.clone().ok_or(LearningError::NotTrained)
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns `true` once a model is available.
    #[must_use]
    pub fn has_training_result(&self) -> bool {
        self.last_model.is_some()
    }
}

fn run(
    config: &PipelineConfig,
    df: &DataFrame,
    reporter: &mut Reporter<'_>,
) -> Result<(TrainingResult, TrainedModel)> {
    let started = Instant::now();
    let target = config.target_column.as_str();
    let params = config.forest_params();
    let mut warnings = Vec::new();

    reporter.stage(TrainingStage::Initializing, 0.0, "Starting training");
    info!(
        rows = df.height(),
        columns = df.width(),
        n_estimators = config.n_estimators,
        seed = config.random_seed,
        "Training started"
    );

    // Filtering
    reporter.stage(TrainingStage::Filtering, 0.05, "Filtering outcomes");
    let filtered = filter_target(df, target)?;
    if filtered.height() == 0 {
        return Err(LearningError::TrainingFailed(
            "no rows with outcome Desistente or Graduado".to_string(),
        ));
    }
    info!(
        kept = filtered.height(),
        dropped = df.height() - filtered.height(),
        "Filtered outcomes"
    );

    // Preprocessing
    reporter.stage(TrainingStage::Preprocessing, 0.15, "Preparing features");
    let (predictors, labels) = split_predictors(&filtered, target)?;
    let typing = column_typing(&predictors);
    for column in &typing.ignored {
        let message = format!("Column '{column}' has an unsupported type and was ignored");
        warn!("{message}");
        warnings.push(message);
    }
    let layout = ColumnLayout::from(&typing);
    if layout.is_empty() {
        return Err(LearningError::TrainingFailed(
            "no numeric or categorical predictor columns".to_string(),
        ));
    }
    debug!(
        numeric = layout.numeric.len(),
        categorical = layout.categorical.len(),
        "Typed predictor columns"
    );

    let table = FeatureTable::from_dataframe(&predictors, &layout)?;
    let (train_rows, test_rows) =
        stratified_train_test_split(&labels, config.test_size, config.random_seed)?;
    let train_table = table.select_rows(&train_rows);
    let test_table = table.select_rows(&test_rows);
    let train_labels: Vec<u8> = train_rows.iter().map(|&i| labels[i]).collect();
    let test_labels: Vec<u8> = test_rows.iter().map(|&i| labels[i]).collect();
    info!(
        train = train_rows.len(),
        test = test_rows.len(),
        "Split rows"
    );

    // Cross-validation
    let folds = StratifiedKFold::new(config.cv_folds, config.random_seed).split(&train_labels)?;
    let n_folds = folds.len();
    reporter.stage(
        TrainingStage::CrossValidation,
        0.25,
        format!("Cross-validating over {n_folds} folds"),
    );
    let mut cv_auc_scores = Vec::with_capacity(n_folds);
    for (fold, (fit_rows, score_rows)) in folds.iter().enumerate() {
        let fold_labels: Vec<u8> = fit_rows.iter().map(|&i| train_labels[i]).collect();
        let score_labels: Vec<u8> = score_rows.iter().map(|&i| train_labels[i]).collect();

        let fitted = FittedPipeline::fit(
            &train_table.select_rows(fit_rows),
            &fold_labels,
            &layout,
            &params,
        )?;
        let scores = fitted.dropout_probabilities(&train_table.select_rows(score_rows))?;
        let auc = roc_auc(&score_labels, &scores)?;
        debug!(fold = fold + 1, auc, "Fold scored");
        cv_auc_scores.push(auc);

        reporter.send(ProgressUpdate {
            stage: TrainingStage::CrossValidation,
            progress: 0.25 + 0.45 * (fold + 1) as f64 / n_folds as f64,
            message: format!("Fold {}/{} AUC {:.4}", fold + 1, n_folds, auc),
            folds_completed: Some((fold + 1, n_folds)),
        });
    }
    let (cv_auc_mean, cv_auc_std) = mean_std(&cv_auc_scores);
    info!(mean = cv_auc_mean, std = cv_auc_std, "Cross-validation done");

    // Training
    reporter.stage(TrainingStage::Training, 0.75, "Fitting final model");
    let fitted = FittedPipeline::fit(&train_table, &train_labels, &layout, &params)?;

    // Evaluation
    reporter.stage(TrainingStage::Evaluation, 0.9, "Evaluating on held-out rows");
    let test_scores = fitted.dropout_probabilities(&test_table)?;
    let test_predictions: Vec<u8> = test_scores.iter().map(|&p| u8::from(p > 0.5)).collect();
    let confusion_matrix = ConfusionMatrix::from_predictions(&test_labels, &test_predictions)?;
    let classification_report = ClassificationReport::from_confusion(&confusion_matrix);
    let test_auc = roc_auc(&test_labels, &test_scores)?;
    let train_auc = roc_auc(&train_labels, &fitted.dropout_probabilities(&train_table)?)?;
    let diagnosis = FitDiagnosis::assess(train_auc, test_auc, &FitThresholds::from(config));
    info!(
        train_auc,
        test_auc,
        accuracy = classification_report.accuracy,
        diagnosis = ?diagnosis,
        "Evaluation done"
    );

    let info = ModelInfo {
        algorithm: ALGORITHM.to_string(),
        trained_at: Utc::now(),
        target_column: config.target_column.clone(),
        numeric_features: layout.numeric.clone(),
        categorical_features: layout.categorical.clone(),
        n_estimators: config.n_estimators,
        random_seed: config.random_seed,
        n_training_rows: train_rows.len(),
        test_auc,
    };
    let feature_importance = fitted.ranked_importances();
    let model = TrainedModel::new(info, layout, fitted);

    let result = TrainingResult {
        rows_loaded: df.height(),
        rows_kept: filtered.height(),
        train_size: train_rows.len(),
        test_size: test_rows.len(),
        metrics: Metrics {
            cv_auc_scores,
            cv_auc_mean,
            cv_auc_std,
            train_auc,
            test_auc,
            accuracy: classification_report.accuracy,
        },
        confusion_matrix,
        classification_report,
        diagnosis,
        feature_importance,
        training_time_seconds: started.elapsed().as_secs_f64(),
        warnings,
    };

    reporter.stage(TrainingStage::Complete, 1.0, "Training complete");
    Ok((result, model))
}

/// Builder for [`Pipeline`].
///
/// - [`config()`](Self::config): pipeline configuration (required)
/// - [`on_progress()`](Self::on_progress): progress callback (optional)
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_callback: Option<ProgressCallback>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PipelineBuilder {
    /// Set the pipeline configuration (required).
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the progress callback (optional).
    ///
    /// The callback runs inline with training and should return quickly.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if no configuration was set.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.ok_or_else(|| {
            LearningError::InvalidConfig("config is required; call .config() first".to_string())
        })?;
        Ok(Pipeline {
            config,
            progress_callback: self.progress_callback,
            last_model: None,
        })
    }
}
