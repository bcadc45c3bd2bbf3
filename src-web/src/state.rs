//! Shared server state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use evasao_learning::{LearningError, TrainedModel};
use once_cell::sync::OnceCell;
use tracing::{error, info, warn};

/// Lazily loaded, process-wide model.
///
/// The artifact is read on the first [`get`](Self::get) and reused for every
/// later call. A failed load is not cached: the next call tries again.
#[derive(Debug)]
pub struct ModelHandle {
    path: PathBuf,
    model: OnceCell<Arc<TrainedModel>>,
}

impl ModelHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            model: OnceCell::new(),
        }
    }

    /// A handle whose model is already in memory.
    pub fn with_model(path: impl Into<PathBuf>, model: TrainedModel) -> Self {
        Self {
            path: path.into(),
            model: OnceCell::with_value(Arc::new(model)),
        }
    }

    /// Artifact path this handle loads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the model, loading it on first use.
    ///
    /// Concurrent first calls block on a single load.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ModelNotFound`] or
    /// [`LearningError::CorruptModel`] when the artifact cannot be read.
    pub fn get(&self) -> Result<Arc<TrainedModel>, LearningError> {
        self.model
            .get_or_try_init(|| -> Result<_, LearningError> {
                info!("Loading model from {}", self.path.display());
                let model = TrainedModel::load(&self.path).inspect_err(|err| {
                    if err.is_artifact_error() {
                        warn!(code = err.error_code(), "Model load failed: {err}");
                    } else {
                        error!(code = err.error_code(), "Model load failed: {err}");
                    }
                })?;
                info!(
                    trees = model.forest().trees().len(),
                    features = model.forest().n_features(),
                    "Model loaded"
                );
                Ok(Arc::new(model))
            })
            .map(Arc::clone)
    }

    /// The model, if it has already been loaded.
    pub fn loaded(&self) -> Option<Arc<TrainedModel>> {
        self.model.get().map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }
}

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pub model: ModelHandle,
}

impl AppState {
    pub fn new(model: ModelHandle) -> Arc<Self> {
        Arc::new(Self { model })
    }
}
