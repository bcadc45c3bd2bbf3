//! Labeled dataset loading and preparation.
//!
//! The training data is a table with a `Target` column holding the outcome
//! (`"Desistente"`, `"Graduado"`, or other enrolment states) and one column per
//! predictor. Only the two outcomes of interest are kept; everything else is
//! dropped silently before training.

use std::path::{Path, PathBuf};

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DataError, Result, ResultExt};
use crate::spreadsheet::read_first_sheet;
use crate::utils::{DtypeCategory, extension_of, get_dtype_category};

/// Name of the outcome column.
pub const TARGET_COLUMN: &str = "Target";

/// Outcome mapped to the positive class (1).
pub const DROPOUT_LABEL: &str = "Desistente";

/// Outcome mapped to the negative class (0).
pub const GRADUATE_LABEL: &str = "Graduado";

/// Load a dataset from CSV, Parquet or the first sheet of a workbook, chosen
/// by file extension.
///
/// # Errors
///
/// Returns [`DataError::UnsupportedFormat`] for any other extension,
/// [`DataError::Spreadsheet`] for an unreadable workbook, and propagates IO
/// and parse errors unchanged.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let extension = extension_of(path).unwrap_or_default();

    let df = match extension.as_str() {
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()
            .context(format!("Reading CSV {}", path.display()))?,
        "parquet" | "pq" => {
            let file = std::fs::File::open(path)?;
            ParquetReader::new(file)
                .finish()
                .context(format!("Reading Parquet {}", path.display()))?
        }
        "xlsx" | "xlsm" | "xls" | "ods" => read_first_sheet(path)?,
        other => return Err(DataError::UnsupportedFormat(other.to_string())),
    };

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Dataset loaded"
    );
    Ok(df)
}

fn target_strings(df: &DataFrame, target: &str) -> Result<Series> {
    let column = df
        .column(target)
        .map_err(|_| DataError::ColumnNotFound(target.to_string()))?;
    Ok(column.as_materialized_series().cast(&DataType::String)?)
}

/// Keep only rows whose target is `"Desistente"` or `"Graduado"`.
///
/// Rows with any other target, including nulls, are dropped without error.
///
/// # Errors
///
/// Returns [`DataError::ColumnNotFound`] if the target column is missing.
pub fn filter_target(df: &DataFrame, target: &str) -> Result<DataFrame> {
    let values = target_strings(df, target)?;
    let mask: BooleanChunked = values
        .str()?
        .into_iter()
        .map(|value| Some(matches!(value, Some(DROPOUT_LABEL) | Some(GRADUATE_LABEL))))
        .collect();

    let filtered = df.filter(&mask)?;
    debug!(
        kept = filtered.height(),
        dropped = df.height() - filtered.height(),
        "Filtered rows by target"
    );
    Ok(filtered)
}

/// Map a target value to its class: `Desistente → 1`, `Graduado → 0`.
pub fn encode_label(value: &str) -> Option<u8> {
    match value {
        DROPOUT_LABEL => Some(1),
        GRADUATE_LABEL => Some(0),
        _ => None,
    }
}

/// Map a class back to its target value.
pub fn decode_label(class: u8) -> &'static str {
    if class == 1 { DROPOUT_LABEL } else { GRADUATE_LABEL }
}

/// Encode the target column of an already filtered frame.
///
/// # Errors
///
/// Returns [`DataError::InvalidLabel`] on any value other than the two
/// known outcomes; call [`filter_target`] first.
pub fn label_vector(df: &DataFrame, target: &str) -> Result<Vec<u8>> {
    let values = target_strings(df, target)?;
    values
        .str()?
        .into_iter()
        .map(|value| match value {
            Some(v) => encode_label(v).ok_or_else(|| DataError::InvalidLabel(v.to_string())),
            None => Err(DataError::InvalidLabel("null".to_string())),
        })
        .collect()
}

/// Separate predictors from the encoded target.
///
/// # Errors
///
/// Propagates [`label_vector`] errors.
pub fn split_predictors(df: &DataFrame, target: &str) -> Result<(DataFrame, Vec<u8>)> {
    let labels = label_vector(df, target)?;
    let predictors = df.drop(target)?;
    Ok((predictors, labels))
}

/// Predictor columns partitioned by stored data type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTyping {
    /// Integer, float and boolean columns, scaled at training time.
    pub numeric: Vec<String>,
    /// Text columns, one-hot encoded at training time.
    pub categorical: Vec<String>,
    /// Columns of any other type; they take no part in training.
    pub ignored: Vec<String>,
}

/// Partition predictor columns by their stored data type.
pub fn column_typing(df: &DataFrame) -> ColumnTyping {
    let mut typing = ColumnTyping::default();
    for column in df.get_columns() {
        let name = column.name().to_string();
        match get_dtype_category(column.dtype()) {
            DtypeCategory::Numeric | DtypeCategory::Boolean => typing.numeric.push(name),
            DtypeCategory::String => typing.categorical.push(name),
            DtypeCategory::Other => typing.ignored.push(name),
        }
    }
    typing
}
