//! HTTP-level tests for the prediction form and JSON API.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use evasao_data::schema::{CURSO_OPTIONS, GENERO_OPTIONS, columns};
use evasao_data::{FIELDS, StudentRecord, TARGET_COLUMN};
use evasao_learning::{Pipeline, PipelineConfig, TrainedModel};
use evasao_web::verdict::format_percent;
use evasao_web::{AppState, ModelHandle, router};
use once_cell::sync::Lazy;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

// ============================================================================
// Helper Functions
// ============================================================================

/// Records where dropout follows the admission grade and nothing else.
fn training_frame() -> DataFrame {
    let mut frame: Option<DataFrame> = None;

    for i in 0..240usize {
        let dropout = i % 5 < 2;
        let record = StudentRecord {
            nota_admissao: if dropout {
                (i % 9) as f64 + 0.5
            } else {
                11.0 + (i % 9) as f64
            },
            curso: CURSO_OPTIONS[(i * 7) % CURSO_OPTIONS.len()].to_string(),
            genero: GENERO_OPTIONS[(i / 3) % GENERO_OPTIONS.len()].to_string(),
            unidades_curriculares1_semestre_inscrito: ((i * 3) % 11) as i64,
            taxa_desemprego: ((i * 13) % 100) as f64,
            ..StudentRecord::default()
        };

        let mut row = record.to_dataframe().unwrap();
        let label = if dropout { "Desistente" } else { "Graduado" };
        row.with_column(Column::new(TARGET_COLUMN.into(), &[label]))
            .unwrap();

        match frame.as_mut() {
            Some(df) => {
                df.vstack_mut(&row).unwrap();
            }
            None => frame = Some(row),
        }
    }

    frame.unwrap()
}

static MODEL: Lazy<TrainedModel> = Lazy::new(|| {
    let config = PipelineConfig::builder().n_estimators(25).build().unwrap();
    let mut pipeline = Pipeline::builder().config(config).build().unwrap();
    pipeline.train(&training_frame()).unwrap();
    pipeline.create_trained_model().unwrap()
});

fn app_with_model() -> Router {
    router(AppState::new(ModelHandle::with_model(
        "modelo_evasao.bin",
        MODEL.clone(),
    )))
}

fn app_without_model(dir: &Path) -> Router {
    router(AppState::new(ModelHandle::new(dir.join("modelo_evasao.bin"))))
}

/// Percent-encode a form component.
fn encode(text: &str) -> String {
    text.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
                (b as char).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect()
}

/// Encode a record the way the browser submits the form.
fn form_body(record: &StudentRecord) -> String {
    record
        .values()
        .iter()
        .map(|(column, value)| format!("{}={}", encode(column), encode(&value.to_string())))
        .collect::<Vec<_>>()
        .join("&")
}

fn post_form(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn post_json(value: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(value).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn text_body(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn json_body(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// GET /
// ============================================================================

#[tokio::test]
async fn test_index_renders_every_field() {
    let resp = app_with_model().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let page = text_body(resp).await;
    for spec in &FIELDS {
        assert!(page.contains(&format!("name=\"{}\"", spec.column)));
    }
    assert!(page.contains("Previsão de Evasão Acadêmica de Estudantes"));
    assert!(page.contains("Insira os dados do estudante:"));
    assert!(page.contains("Prever Evasão"));
    assert!(!page.contains("Probabilidade de evasão"));
}

#[tokio::test]
async fn test_index_without_model_is_an_error_page() {
    let dir = tempfile::tempdir().unwrap();
    let resp = app_without_model(dir.path()).oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let page = text_body(resp).await;
    assert!(page.contains("MODEL_UNAVAILABLE"));
    assert!(!page.contains("<form"));
}

#[tokio::test]
async fn test_model_loads_on_first_request_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modelo_evasao.bin");
    MODEL.save(&path).unwrap();

    let state = AppState::new(ModelHandle::new(&path));
    let app = router(Arc::clone(&state));

    let health = json_body(app.clone().oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(health["model_loaded"], false);

    let resp = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let first = state.model.loaded().unwrap();

    // Removing the file does not matter once the model is cached.
    std::fs::remove_file(&path).unwrap();
    let resp = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(Arc::ptr_eq(&first, &state.model.loaded().unwrap()));

    let health = json_body(app.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(health["model_loaded"], true);
}

#[tokio::test]
async fn test_health_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let resp = app_without_model(dir.path())
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["model_loaded"], false);
}

// ============================================================================
// POST /predict
// ============================================================================

#[tokio::test]
async fn test_low_grade_submission_shows_dropout_verdict() {
    let record = StudentRecord {
        nota_admissao: 1.0,
        ..StudentRecord::default()
    };
    let resp = app_with_model()
        .oneshot(post_form(form_body(&record)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let page = text_body(resp).await;
    assert!(page.contains("alert-error"));
    assert!(page.contains("(Desistente)</div>"));
    assert!(page.contains("name=\"NotaAdmissao\" min=\"0\" max=\"20\" step=\"0.01\" value=\"1\""));
}

#[tokio::test]
async fn test_high_grade_submission_shows_graduate_verdict() {
    let record = StudentRecord {
        nota_admissao: 19.0,
        ..StudentRecord::default()
    };
    let resp = app_with_model()
        .oneshot(post_form(form_body(&record)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let page = text_body(resp).await;
    assert!(page.contains("alert-success"));
    assert!(page.contains("(Graduado)</div>"));
}

#[tokio::test]
async fn test_out_of_range_submission_is_rejected() {
    let record = StudentRecord {
        nota_admissao: 25.0,
        ..StudentRecord::default()
    };
    let resp = app_with_model()
        .oneshot(post_form(form_body(&record)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let page = text_body(resp).await;
    assert!(page.contains(columns::NOTA_ADMISSAO));
    assert!(page.contains("<form"));
    assert!(!page.contains("Probabilidade de evasão"));
}

#[tokio::test]
async fn test_unparsable_submission_is_rejected() {
    let body = form_body(&StudentRecord::default()).replace("NotaAdmissao=10", "NotaAdmissao=dez");
    let resp = app_with_model().oneshot(post_form(body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(text_body(resp).await.contains("INVALID_INPUT"));
}

// ============================================================================
// POST /api/predict
// ============================================================================

#[tokio::test]
async fn test_api_returns_verdict() {
    let record = StudentRecord {
        nota_admissao: 1.0,
        ..StudentRecord::default()
    };
    let resp = app_with_model()
        .oneshot(post_json(&serde_json::to_value(&record).unwrap()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    let probability = json["dropout_probability"].as_f64().unwrap();
    assert_eq!(json["predicted_class"], 1);
    assert_eq!(json["label"], "Desistente");
    assert_eq!(json["style"], "error");
    assert_eq!(
        json["message"],
        format!(
            "Probabilidade de evasão: {} (Desistente)",
            format_percent(probability)
        )
    );
}

#[tokio::test]
async fn test_api_matches_direct_scoring() {
    let record = StudentRecord {
        nota_admissao: 14.5,
        curso: CURSO_OPTIONS[3].to_string(),
        ..StudentRecord::default()
    };
    let expected = MODEL.predict_record(&record).unwrap();

    let resp = app_with_model()
        .oneshot(post_json(&serde_json::to_value(&record).unwrap()))
        .await
        .unwrap();
    let json = json_body(resp).await;
    assert_eq!(json["predicted_class"], expected.class);
    assert_eq!(
        json["dropout_probability"].as_f64().unwrap(),
        expected.dropout_probability
    );
}

#[tokio::test]
async fn test_api_rejects_unknown_option() {
    let mut value = serde_json::to_value(StudentRecord::default()).unwrap();
    value[columns::ESTADO_CIVIL] = serde_json::json!("Noivo");

    let resp = app_with_model().oneshot(post_json(&value)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "INVALID_FIELD");
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .contains(columns::ESTADO_CIVIL)
    );
}

#[tokio::test]
async fn test_api_rejects_missing_field() {
    let mut value = serde_json::to_value(StudentRecord::default()).unwrap();
    value.as_object_mut().unwrap().remove(columns::PIB);

    let resp = app_with_model().oneshot(post_json(&value)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(resp).await["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_api_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let value = serde_json::to_value(StudentRecord::default()).unwrap();
    let resp = app_without_model(dir.path())
        .oneshot(post_json(&value))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["error"]["code"], "MODEL_UNAVAILABLE");
}
