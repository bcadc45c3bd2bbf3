//! Integration tests for training, evaluation and the model artifact.

use evasao_data::schema::columns;
use evasao_data::{FIELDS, FieldKind, StudentRecord, TARGET_COLUMN};
use evasao_learning::{
    FitDiagnosis, FitThresholds, LearningError, Pipeline, PipelineConfig, TrainedModel,
    TrainingResult,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// Helper Functions
// ============================================================================

/// A full-schema frame where dropout depends on the admission grade only.
///
/// The first `n_dropout` rows are `Desistente` with a grade below 9, the rest
/// are `Graduado` with a grade of at least 11. Every other predictor is noise.
fn synthetic_frame(n_dropout: usize, n_graduate: usize, seed: u64) -> DataFrame {
    let n = n_dropout + n_graduate;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut frame_columns: Vec<Column> = FIELDS
        .iter()
        .map(|spec| {
            if spec.column == columns::NOTA_ADMISSAO {
                let grades: Vec<f64> = (0..n)
                    .map(|i| {
                        if i < n_dropout {
                            rng.gen_range(0.0..9.0)
                        } else {
                            rng.gen_range(11.0..=20.0)
                        }
                    })
                    .collect();
                return Column::new(spec.column.into(), grades);
            }
            match spec.kind {
                FieldKind::Categorical { options } => {
                    let values: Vec<&str> = (0..n)
                        .map(|_| options[rng.gen_range(0..options.len())])
                        .collect();
                    Column::new(spec.column.into(), values)
                }
                FieldKind::Flag => {
                    let values: Vec<i64> = (0..n).map(|_| rng.gen_range(0..=1i64)).collect();
                    Column::new(spec.column.into(), values)
                }
                FieldKind::Integer { min, max, .. } => {
                    let values: Vec<i64> = (0..n).map(|_| rng.gen_range(min..=max)).collect();
                    Column::new(spec.column.into(), values)
                }
                FieldKind::Decimal { min, max, .. } => {
                    let values: Vec<f64> = (0..n).map(|_| rng.gen_range(min..=max)).collect();
                    Column::new(spec.column.into(), values)
                }
            }
        })
        .collect();

    let targets: Vec<&str> = (0..n)
        .map(|i| if i < n_dropout { "Desistente" } else { "Graduado" })
        .collect();
    frame_columns.push(Column::new(TARGET_COLUMN.into(), targets));

    DataFrame::new(frame_columns).unwrap()
}

fn quick_config() -> PipelineConfig {
    PipelineConfig::builder().n_estimators(20).build().unwrap()
}

fn train(df: &DataFrame) -> (TrainingResult, TrainedModel) {
    let mut pipeline = Pipeline::builder().config(quick_config()).build().unwrap();
    let result = pipeline.train(df).unwrap();
    let model = pipeline.create_trained_model().unwrap();
    (result, model)
}

fn max_grade(df: &DataFrame) -> f64 {
    df.column(columns::NOTA_ADMISSAO)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .max()
        .unwrap()
}

// ============================================================================
// End-to-end training
// ============================================================================

#[test]
fn test_thousand_rows_stratified_split() {
    let df = synthetic_frame(400, 600, 1);
    let (result, _) = train(&df);

    assert_eq!(result.rows_loaded, 1000);
    assert_eq!(result.rows_kept, 1000);
    assert_eq!(result.train_size, 800);
    assert_eq!(result.test_size, 200);
    assert_eq!(result.confusion_matrix.support(1), 80);
    assert_eq!(result.confusion_matrix.support(0), 120);
    assert_eq!(result.metrics.cv_auc_scores.len(), 5);
    assert!(result.metrics.test_auc > 0.9);
}

#[test]
fn test_other_outcomes_never_reach_training() {
    let mut df = synthetic_frame(100, 150, 2);
    let enrolled = synthetic_frame(0, 30, 3)
        .lazy()
        .with_column(lit("Matriculado").alias(TARGET_COLUMN))
        .collect()
        .unwrap();
    df.vstack_mut(&enrolled).unwrap();

    let (result, _) = train(&df);
    assert_eq!(result.rows_loaded, 280);
    assert_eq!(result.rows_kept, 250);
    assert_eq!(result.train_size + result.test_size, 250);
}

#[test]
fn test_training_is_reproducible() {
    let df = synthetic_frame(120, 180, 4);
    let (first, _) = train(&df);
    let (second, _) = train(&df);

    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.confusion_matrix, second.confusion_matrix);
    assert_eq!(first.classification_report, second.classification_report);
    assert_eq!(first.feature_importance, second.feature_importance);
}

#[test]
fn test_diagnosis_matches_reported_aucs() {
    let df = synthetic_frame(120, 180, 5);
    let (result, _) = train(&df);

    let expected = FitDiagnosis::assess(
        result.metrics.train_auc,
        result.metrics.test_auc,
        &FitThresholds::default(),
    );
    assert_eq!(result.diagnosis, expected);
}

#[test]
fn test_admission_grade_ranks_first() {
    let df = synthetic_frame(200, 300, 6);
    let (result, _) = train(&df);
    assert_eq!(result.feature_importance[0].0, columns::NOTA_ADMISSAO);
}

#[test]
fn test_report_serializes_to_json() {
    let df = synthetic_frame(60, 90, 7);
    let (result, _) = train(&df);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["rows_kept"], 150);
    assert!(json["metrics"]["cv_auc_scores"].is_array());
    assert!(json["confusion_matrix"]["matrix"].is_array());
    assert!(json["diagnosis"].is_string());
}

// ============================================================================
// Model artifact
// ============================================================================

#[test]
fn test_saved_model_reproduces_predictions() {
    let df = synthetic_frame(120, 180, 8);
    let (_, model) = train(&df);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modelo_evasao.bin");
    model.save(&path).unwrap();
    let loaded = TrainedModel::load(&path).unwrap();

    let sample = df.slice(0, 50);
    assert_eq!(
        model.predict_proba(&sample).unwrap(),
        loaded.predict_proba(&sample).unwrap()
    );
    assert_eq!(model.predict(&sample).unwrap(), loaded.predict(&sample).unwrap());
    assert_eq!(loaded.info(), model.info());
}

#[test]
fn test_model_info_describes_training() {
    let df = synthetic_frame(60, 90, 9);
    let (result, model) = train(&df);
    let info = model.info();

    assert_eq!(info.algorithm, "random_forest");
    assert_eq!(info.target_column, TARGET_COLUMN);
    assert_eq!(info.n_estimators, 20);
    assert_eq!(info.random_seed, 42);
    assert_eq!(info.n_training_rows, result.train_size);
    assert_eq!(info.test_auc, result.metrics.test_auc);
    assert_eq!(
        info.numeric_features.len() + info.categorical_features.len(),
        FIELDS.len()
    );
}

#[test]
fn test_corrupt_artifact_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modelo_evasao.bin");
    std::fs::write(&path, b"definitely not a model").unwrap();

    let err = TrainedModel::load(&path).unwrap_err();
    assert!(matches!(err, LearningError::CorruptModel(_)));
}

// ============================================================================
// Scoring single records
// ============================================================================

#[test]
fn test_high_admission_grade_predicts_graduate() {
    let df = synthetic_frame(400, 600, 10);
    let (_, model) = train(&df);

    let record = StudentRecord {
        nota_admissao: max_grade(&df),
        ..StudentRecord::default()
    };
    let prediction = model.predict_record(&record).unwrap();

    assert_eq!(prediction.class, 0);
    assert_eq!(prediction.label, "Graduado");
    assert!(prediction.dropout_probability < 0.5);
}

#[test]
fn test_low_admission_grade_predicts_dropout() {
    let df = synthetic_frame(400, 600, 11);
    let (_, model) = train(&df);

    let record = StudentRecord {
        nota_admissao: 1.0,
        ..StudentRecord::default()
    };
    let prediction = model.predict_record(&record).unwrap();
    assert_eq!(prediction.class, 1);
    assert_eq!(prediction.label, "Desistente");
}

#[test]
fn test_unseen_category_scores_without_error() {
    let df = synthetic_frame(60, 90, 12);
    let (_, model) = train(&df);

    let record = StudentRecord {
        curso: "Astronomia".to_string(),
        nacionalidade: "Atlântida".to_string(),
        ..StudentRecord::default()
    };
    let prediction = model.predict_record(&record).unwrap();
    assert!((0.0..=1.0).contains(&prediction.dropout_probability));
}

#[test]
fn test_missing_column_at_inference() {
    let df = synthetic_frame(60, 90, 13);
    let (_, model) = train(&df);

    let without_course = StudentRecord::default()
        .to_dataframe()
        .unwrap()
        .drop(columns::CURSO)
        .unwrap();
    let err = model.predict(&without_course).unwrap_err();
    assert!(matches!(err, LearningError::MissingColumn(ref c) if c == columns::CURSO));
}
