//! HTTP handlers and the router.
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /` | The empty form, filled with defaults |
//! | `POST /predict` | Urlencoded form submission, re-renders with the verdict |
//! | `POST /api/predict` | JSON [`StudentRecord`] in, JSON [`Verdict`] out |
//! | `GET /health` | Liveness and whether the model is loaded |
//!
//! The page routes load the model before rendering anything, so a missing
//! or corrupt artifact yields an error page instead of a form that cannot
//! be submitted.

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json};
use evasao_data::StudentRecord;
use evasao_learning::TrainedModel;
use tracing::{debug, warn};

use crate::error::{PageError, Result, WebError};
use crate::form::{self, Notice};
use crate::state::AppState;
use crate::verdict::Verdict;

/// Build the axum [`Router`] with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/predict", post(predict_api))
        .route("/health", get(health))
        .with_state(state)
}

/// Get the shared model, reading the artifact on a blocking thread the
/// first time.
async fn model(state: &Arc<AppState>) -> Result<Arc<TrainedModel>> {
    if let Some(model) = state.model.loaded() {
        return Ok(model);
    }

    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || state.model.get())
        .await
        .map_err(|e| WebError::Internal(format!("Model loading task failed: {e}")))?
        .map_err(WebError::model_load)
}

fn score(model: &TrainedModel, record: &StudentRecord) -> Result<Verdict> {
    let prediction = model.predict_record(record)?;
    debug!(
        class = prediction.class,
        probability = prediction.dropout_probability,
        "Scored record"
    );
    Ok(Verdict::from(prediction))
}

/// `GET /`
pub async fn index(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Html<String>, PageError> {
    model(&state).await?;
    Ok(Html(form::render_page(&StudentRecord::default(), None)))
}

/// `POST /predict`
pub async fn predict_form(
    State(state): State<Arc<AppState>>,
    submission: std::result::Result<Form<StudentRecord>, FormRejection>,
) -> std::result::Result<Response, PageError> {
    let model = model(&state).await?;
    let Form(record) = submission.map_err(|rejection| {
        warn!("Rejected form submission: {}", rejection.body_text());
        WebError::InvalidInput(rejection.body_text())
    })?;

    if let Err(err) = record.validate() {
        warn!(code = err.error_code(), "Invalid form submission: {err}");
        let page = form::render_page(&record, Some(Notice::Problem(&err.to_string())));
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response());
    }

    let verdict = score(&model, &record)?;
    let page = form::render_page(&record, Some(Notice::Verdict(&verdict)));
    Ok(Html(page).into_response())
}

/// `POST /api/predict`
pub async fn predict_api(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<StudentRecord>, JsonRejection>,
) -> Result<Json<Verdict>> {
    let model = model(&state).await?;
    let Json(record) = payload.map_err(|rejection| WebError::InvalidInput(rejection.body_text()))?;
    record.validate()?;
    Ok(Json(score(&model, &record)?))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "model_loaded": state.model.is_loaded(),
        "model_path": state.model.path().display().to_string(),
    }))
}
