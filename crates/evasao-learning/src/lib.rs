//! evasao-learning: student dropout classifier training and inference.
//!
//! This crate trains a random forest that separates students who drop out
//! (`Desistente`, class 1) from those who graduate (`Graduado`, class 0),
//! evaluates it, and packages the fitted preprocessing and forest as a single
//! [`TrainedModel`] artifact for the prediction form.
//!
//! # Features
//!
//! - **Preprocessing**: standard scaling of numeric columns, one-hot expansion
//!   of text columns with unknown categories encoded as all zeros
//! - **Random forest**: CART trees on Gini impurity with bootstrap rows and
//!   random feature subsets, seeded for bit-identical reruns
//! - **Evaluation**: stratified k-fold AUC, held-out AUC, confusion matrix,
//!   classification report and an over/underfitting notice
//! - **Progress Reporting**: stage-by-stage training callbacks
//! - **Persistence**: compact binary artifact with a magic header
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use evasao_learning::{Pipeline, PipelineConfig, TrainedModel};
//!
//! let df = evasao_data::load_dataset("dados/StudentsPrepared.csv")?;
//!
//! let mut pipeline = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .on_progress(|u| println!("{:.0}% - {}", u.progress * 100.0, u.message))
//!     .build()?;
//!
//! let result = pipeline.train(&df)?;
//! println!("{}", result.classification_report);
//!
//! pipeline.create_trained_model()?.save("modelo_evasao.bin")?;
//!
//! // Later, in the serving process
//! let model = TrainedModel::load("modelo_evasao.bin")?;
//! let verdict = model.predict_record(&evasao_data::StudentRecord::default())?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! DataFrame ──► filter/label ──► FeatureTable ──► ColumnTransformer ──► Matrix
//!                                                                        │
//!                              TrainedModel ◄── RandomForest ◄───────────┘
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](LearningError):
//!
//! - [`LearningError::InvalidConfig`] - Invalid pipeline configuration
//! - [`LearningError::InvalidData`] - Nulls, bad types, too few rows per class
//! - [`LearningError::MissingColumn`] - Input lacks a column the model needs
//! - [`LearningError::TrainingFailed`] - Empty or single-class training set
//! - [`LearningError::ModelNotFound`] / [`LearningError::CorruptModel`] - Artifact errors
//!
//! # Thread Safety
//!
//! [`TrainedModel`] is immutable and `Send + Sync`; share it with `Arc`.
//! [`Pipeline`] runs on the calling thread.

pub mod config;
pub mod diagnosis;
pub mod error;
pub mod features;
pub mod forest;
pub mod matrix;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod progress;
pub mod types;
pub mod validation;

// Re-exports for convenient access
pub use config::{MaxFeatures, PipelineConfig, PipelineConfigBuilder};
pub use diagnosis::{FitDiagnosis, FitThresholds};
pub use error::{LearningError, Result};
pub use features::{ColumnLayout, FeatureTable};
pub use forest::{DecisionTree, ForestParams, RandomForest};
pub use matrix::Matrix;
pub use metrics::{ClassificationReport, ConfusionMatrix, mean_std, roc_auc};
pub use model::{FittedPipeline, MODEL_MAGIC, TrainedModel};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use preprocessing::{ColumnTransformer, OneHotEncoder, StandardScaler};
pub use progress::{ParseTrainingStageError, ProgressCallback, ProgressUpdate, TrainingStage};
pub use types::{Metrics, ModelInfo, PredictionResult, TrainingResult};
pub use validation::{StratifiedKFold, stratified_train_test_split};
