//! Error types for the prediction server.
//!
//! [`WebError`] renders as a JSON `{ "error": { "code", "message" } }` body
//! with the matching status code. Page handlers wrap it in [`PageError`] to
//! get an HTML error page instead.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use evasao_data::DataError;
use evasao_learning::LearningError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::form;

/// The main error type for request handling.
#[derive(Error, Debug)]
pub enum WebError {
    /// The model artifact could not be loaded.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[source] LearningError),

    /// The submitted record could not be parsed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The submitted record parsed but violates a field domain.
    #[error(transparent)]
    InvalidRecord(#[from] DataError),

    /// Scoring the record failed.
    #[error("Prediction failed: {0}")]
    Prediction(#[from] LearningError),

    /// A blocking task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebError {
    /// Stable error code for API consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidRecord(inner) => inner.error_code(),
            Self::Prediction(inner) => inner.error_code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Wrap a failed model load: a missing or corrupt artifact makes the
    /// model unavailable, anything else is an internal failure.
    pub fn model_load(err: LearningError) -> Self {
        if err.is_artifact_error() {
            Self::ModelUnavailable(err)
        } else {
            Self::Internal(format!("Reading model artifact: {err}"))
        }
    }

    /// HTTP status for this error.
    ///
    /// Only errors caused by the submitted values are 422.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidRecord(inner) | Self::Prediction(LearningError::Data(inner))
                if inner.is_user_error() =>
            {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Serialize for WebError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("WebError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": &self });
        (self.status(), Json(body)).into_response()
    }
}

/// A [`WebError`] raised while serving an HTML page.
#[derive(Debug)]
pub struct PageError(pub WebError);

impl From<WebError> for PageError {
    fn from(err: WebError) -> Self {
        Self(err)
    }
}

impl From<DataError> for PageError {
    fn from(err: DataError) -> Self {
        Self(err.into())
    }
}

impl From<LearningError> for PageError {
    fn from(err: LearningError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (self.0.status(), Html(form::render_error_page(&self.0))).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, WebError>;
