//! Integration tests for dataset loading and preparation.

use evasao_data::schema::columns;
use evasao_data::{
    DataError, FIELDS, FieldValue, StudentRecord, TARGET_COLUMN, column_typing, filter_target,
    load_dataset, split_predictors,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::Workbook;
use std::io::Write;

// ============================================================================
// Helper Functions
// ============================================================================

/// Write `rows` records (defaults, with a varying admission grade) plus a
/// target cycling through `targets` to a CSV file.
fn write_csv(dir: &tempfile::TempDir, rows: usize, targets: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join("students.csv");
    let mut file = std::fs::File::create(&path).unwrap();

    let header: Vec<&str> = FIELDS.iter().map(|f| f.column).collect();
    writeln!(file, "{},{}", header.join(","), TARGET_COLUMN).unwrap();

    for i in 0..rows {
        let record = StudentRecord {
            nota_admissao: (i % 20) as f64 + 0.5,
            ..StudentRecord::default()
        };
        let cells: Vec<String> = record
            .values()
            .iter()
            .map(|(_, value)| match value {
                FieldValue::Text(text) => format!("\"{text}\""),
                other => other.to_string(),
            })
            .collect();
        writeln!(file, "{},{}", cells.join(","), targets[i % targets.len()]).unwrap();
    }
    path
}

/// Same records as [`write_csv`], as the only sheet of an `.xlsx` workbook.
fn write_xlsx(dir: &tempfile::TempDir, rows: usize, targets: &[&str]) -> std::path::PathBuf {
    let path = dir.path().join("students.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, spec) in FIELDS.iter().enumerate() {
        sheet.write_string(0, col as u16, spec.column).unwrap();
    }
    sheet
        .write_string(0, FIELDS.len() as u16, TARGET_COLUMN)
        .unwrap();

    for i in 0..rows {
        let row = (i + 1) as u32;
        let record = StudentRecord {
            nota_admissao: (i % 20) as f64 + 0.5,
            ..StudentRecord::default()
        };
        for (col, (_, value)) in record.values().iter().enumerate() {
            let col = col as u16;
            match value {
                FieldValue::Text(text) => sheet.write_string(row, col, *text).unwrap(),
                FieldValue::Integer(v) => sheet.write_number(row, col, *v as f64).unwrap(),
                FieldValue::Decimal(v) => sheet.write_number(row, col, *v).unwrap(),
            };
        }
        sheet
            .write_string(row, FIELDS.len() as u16, targets[i % targets.len()])
            .unwrap();
    }

    workbook.save(&path).unwrap();
    path
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_csv_infers_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, 12, &["Graduado", "Desistente", "Matriculado"]);

    let df = load_dataset(&path).unwrap();
    assert_eq!(df.height(), 12);
    assert_eq!(df.width(), FIELDS.len() + 1);

    let (predictors, _) =
        split_predictors(&filter_target(&df, TARGET_COLUMN).unwrap(), TARGET_COLUMN).unwrap();
    let typing = column_typing(&predictors);

    let expected_categorical: Vec<&str> = FIELDS
        .iter()
        .filter(|f| f.kind.is_categorical())
        .map(|f| f.column)
        .collect();
    assert_eq!(typing.categorical, expected_categorical);
    assert_eq!(typing.numeric.len(), FIELDS.len() - expected_categorical.len());
    assert!(typing.ignored.is_empty());
}

#[test]
fn test_load_missing_file_fails() {
    let result = load_dataset("does/not/exist.csv");
    assert!(result.is_err());
}

#[test]
fn test_load_rejects_unknown_extension() {
    let result = load_dataset("dados/StudentsPrepared.json");
    assert!(matches!(result, Err(DataError::UnsupportedFormat(_))));
}

#[test]
fn test_load_xlsx_first_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_xlsx(&dir, 12, &["Graduado", "Desistente", "Matriculado"]);

    let df = load_dataset(&path).unwrap();
    assert_eq!(df.height(), 12);
    assert_eq!(df.width(), FIELDS.len() + 1);
    assert_eq!(df.column(columns::NOTA_ADMISSAO).unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column(columns::DEVEDOR).unwrap().dtype(), &DataType::Int64);
    assert_eq!(df.column(columns::CURSO).unwrap().dtype(), &DataType::String);

    let filtered = filter_target(&df, TARGET_COLUMN).unwrap();
    assert_eq!(filtered.height(), 8);

    let (predictors, _) = split_predictors(&filtered, TARGET_COLUMN).unwrap();
    let typing = column_typing(&predictors);
    let expected_categorical: Vec<&str> = FIELDS
        .iter()
        .filter(|f| f.kind.is_categorical())
        .map(|f| f.column)
        .collect();
    assert_eq!(typing.categorical, expected_categorical);
    assert!(typing.ignored.is_empty());
}

#[test]
fn test_load_corrupt_xlsx_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"not a zip archive").unwrap();

    let err = load_dataset(&path).unwrap_err();
    assert_eq!(err.error_code(), "SPREADSHEET_ERROR");
}

// ============================================================================
// Filtering & label mapping
// ============================================================================

#[test]
fn test_only_known_outcomes_survive_filtering() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, 30, &["Graduado", "Matriculado", "Desistente", "Outro"]);

    let df = load_dataset(&path).unwrap();
    let filtered = filter_target(&df, TARGET_COLUMN).unwrap();
    assert_eq!(filtered.height(), 15);

    let targets = filtered
        .column(TARGET_COLUMN)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .clone();
    for value in targets.into_iter() {
        let value = value.unwrap();
        assert!(value == "Graduado" || value == "Desistente", "unexpected {value}");
    }
}

#[test]
fn test_label_mapping_counts() {
    let mut targets = vec!["Graduado"; 600];
    targets.extend(vec!["Desistente"; 400]);
    let predictor: Vec<f64> = (0..1000).map(|i| i as f64).collect();
    let df = df!(
        "NotaAdmissao" => predictor,
        "Target" => targets
    )
    .unwrap();

    let filtered = filter_target(&df, TARGET_COLUMN).unwrap();
    assert_eq!(filtered.height(), 1000);

    let (_, labels) = split_predictors(&filtered, TARGET_COLUMN).unwrap();
    assert_eq!(labels.iter().filter(|&&l| l == 1).count(), 400);
    assert!(labels.iter().all(|&l| l == 0 || l == 1));
}
