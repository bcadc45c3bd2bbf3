//! Trained model for inference and serialization.
//!
//! [`TrainedModel`] bundles everything needed to score a student: the
//! [`ColumnLayout`] read from the input, the fitted [`ColumnTransformer`] and
//! the [`RandomForest`]. It is immutable once built and is `Send + Sync`, so a
//! server can share one instance behind an `Arc` across request handlers.
//!
//! # Lifecycle
//!
//! A `TrainedModel` is created in one of two ways:
//!
//! 1. **From training**: [`Pipeline::create_trained_model()`](crate::Pipeline::create_trained_model)
//! 2. **From disk**: [`TrainedModel::load()`]
//!
//! # Artifact format
//!
//! An 8-byte magic header `EVASAO01` followed by a `bitcode` encoding of the
//! model. Anything else is rejected as [`LearningError::CorruptModel`].
//!
//! # Example
//!
//! ```rust,ignore
//! use evasao_data::StudentRecord;
//! use evasao_learning::TrainedModel;
//!
//! let model = TrainedModel::load("modelo_evasao.bin")?;
//! let result = model.predict_record(&StudentRecord::default())?;
//! println!("{} ({:.2}%)", result.label, result.dropout_probability * 100.0);
//! ```

use std::fmt;
use std::path::Path;

use evasao_data::{StudentRecord, decode_label};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;
use tracing::{debug, info};

use crate::error::{LearningError, Result};
use crate::features::{ColumnLayout, FeatureTable};
use crate::forest::{ForestParams, RandomForest};
use crate::matrix::Matrix;
use crate::preprocessing::ColumnTransformer;
use crate::types::{ModelInfo, PredictionResult};

/// Magic header of a serialized model.
pub const MODEL_MAGIC: &[u8; 8] = b"EVASAO01";

/// Preprocessing plus classifier fitted on one set of rows.
///
/// Cross-validation fits one of these per fold; the final one becomes the
/// [`TrainedModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub preprocessor: ColumnTransformer,
    pub forest: RandomForest,
}

impl FittedPipeline {
    /// Fit the transformer and the forest on `table` and `labels`.
    ///
    /// # Errors
    ///
    /// Propagates preprocessing and forest errors.
    pub fn fit(
        table: &FeatureTable,
        labels: &[u8],
        layout: &ColumnLayout,
        params: &ForestParams,
    ) -> Result<Self> {
        let (preprocessor, matrix) = ColumnTransformer::fit_transform(table, layout)?;
        let forest = RandomForest::fit(&matrix, labels, params)?;
        Ok(Self {
            preprocessor,
            forest,
        })
    }

    /// Transform `table` with the fitted preprocessing.
    ///
    /// # Errors
    ///
    /// Propagates [`ColumnTransformer::transform`] errors.
    pub fn transform(&self, table: &FeatureTable) -> Result<Matrix> {
        self.preprocessor.transform(table)
    }

    /// Dropout probability of every row of `table`.
    ///
    /// # Errors
    ///
    /// Propagates transform and forest errors.
    pub fn dropout_probabilities(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        self.forest.dropout_probabilities(&self.transform(table)?)
    }

    /// Transformed feature names with their importances, most important first.
    #[must_use]
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .preprocessor
            .feature_names()
            .into_iter()
            .zip(self.forest.feature_importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

/// A fitted dropout model ready for inference.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    info: ModelInfo,
    layout: ColumnLayout,
    preprocessor: ColumnTransformer,
    forest: RandomForest,
}

assert_impl_all!(TrainedModel: Send, Sync);

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("info", &self.info)
            .field("layout", &self.layout)
            .field("trees", &self.forest.trees().len())
            .finish_non_exhaustive()
    }
}

impl TrainedModel {
    pub(crate) fn new(info: ModelInfo, layout: ColumnLayout, fitted: FittedPipeline) -> Self {
        Self {
            info,
            layout,
            preprocessor: fitted.preprocessor,
            forest: fitted.forest,
        }
    }

    /// Load a model saved with [`save()`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`LearningError::ModelNotFound`] if `path` does not exist
    /// - [`LearningError::CorruptModel`] if the file is not a valid artifact
    /// - [`LearningError::Io`] on other read failures
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(LearningError::ModelNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        let model = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            trained_at = %model.info.trained_at,
            "Model loaded"
        );
        Ok(model)
    }

    /// Write the model to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns IO or encoding errors.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Model saved");
        Ok(())
    }

    /// Serialize to the artifact format.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::Encode`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bitcode::serialize(self)?;
        let mut bytes = Vec::with_capacity(MODEL_MAGIC.len() + payload.len());
        bytes.extend_from_slice(MODEL_MAGIC);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Deserialize from the artifact format.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::CorruptModel`] on a missing header, an
    /// undecodable payload, or a payload whose trees or encoder would not be
    /// safe to predict with.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let payload = bytes.strip_prefix(MODEL_MAGIC.as_slice()).ok_or_else(|| {
            LearningError::CorruptModel("missing EVASAO01 header".to_string())
        })?;
        let model: Self = bitcode::deserialize(payload)
            .map_err(|err| LearningError::CorruptModel(err.to_string()))?;
        if model.forest.n_features() != model.preprocessor.n_outputs() {
            return Err(LearningError::CorruptModel(
                "forest width does not match preprocessing".to_string(),
            ));
        }
        if model.layout != *model.preprocessor.layout() {
            return Err(LearningError::CorruptModel(
                "column layout does not match preprocessing".to_string(),
            ));
        }
        model
            .preprocessor
            .check_structure()
            .and_then(|()| model.forest.check_structure())
            .map_err(LearningError::CorruptModel)?;
        Ok(model)
    }

    /// `[P(graduate), P(dropout)]` for every row of `df`.
    ///
    /// Columns are looked up by name; extra columns are ignored.
    ///
    /// # Errors
    ///
    /// - [`LearningError::MissingColumn`] if a training column is absent
    /// - [`LearningError::InvalidData`] on nulls or non-numeric values in a
    ///   numeric column
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Vec<[f64; 2]>> {
        let table = FeatureTable::from_dataframe(df, &self.layout)?;
        let matrix = self.preprocessor.transform(&table)?;
        let proba = self.forest.predict_proba(&matrix)?;
        debug!(rows = proba.len(), "Scored rows");
        Ok(proba)
    }

    /// Predicted class for every row of `df`: 1 for dropout, 0 for graduate.
    ///
    /// # Errors
    ///
    /// See [`predict_proba()`](Self::predict_proba).
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(df)?
            .into_iter()
            .map(|[_, dropout]| u8::from(dropout > 0.5))
            .collect())
    }

    /// Score one student.
    ///
    /// The record is not range-checked here; call
    /// [`StudentRecord::validate`] first when the values come from users.
    /// Categories unseen at training time score as all-zero encodings.
    ///
    /// # Errors
    ///
    /// See [`predict_proba()`](Self::predict_proba).
    pub fn predict_record(&self, record: &StudentRecord) -> Result<PredictionResult> {
        let df = record.to_dataframe()?;
        let [_, dropout_probability] = self
            .predict_proba(&df)?
            .into_iter()
            .next()
            .ok_or_else(|| LearningError::InvalidData("empty prediction".to_string()))?;
        let class = u8::from(dropout_probability > 0.5);
        Ok(PredictionResult {
            class,
            label: decode_label(class).to_string(),
            dropout_probability,
        })
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn target_column(&self) -> &str {
        &self.info.target_column
    }

    /// Transformed feature names, in model input order.
    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}
