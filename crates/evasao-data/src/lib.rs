//! Student data for academic dropout prediction.
//!
//! This crate owns everything about the shape of the data:
//!
//! - **Schema**: [`FIELDS`] and the statically typed [`StudentRecord`], one
//!   field per predictor, each tagged with its closed option list or numeric
//!   range. Schema drift between training and serving shows up as a compile
//!   error or a failing schema test, not as a bad prediction.
//! - **Dataset**: loading the labeled table, dropping rows whose outcome is
//!   neither `"Desistente"` nor `"Graduado"`, mapping outcomes to `{1, 0}`, and
//!   partitioning predictor columns into numeric and categorical by dtype.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use evasao_data::{TARGET_COLUMN, column_typing, filter_target, load_dataset, split_predictors};
//!
//! let df = load_dataset("dados/StudentsPrepared.csv")?;
//! let df = filter_target(&df, TARGET_COLUMN)?;
//! let (predictors, labels) = split_predictors(&df, TARGET_COLUMN)?;
//! let typing = column_typing(&predictors);
//! println!("{} numeric, {} categorical", typing.numeric.len(), typing.categorical.len());
//! ```

pub mod dataset;
pub mod error;
pub mod schema;
mod spreadsheet;
pub mod utils;

// Re-exports for convenient access
pub use dataset::{
    ColumnTyping, DROPOUT_LABEL, GRADUATE_LABEL, TARGET_COLUMN, column_typing, decode_label,
    encode_label, filter_target, label_vector, load_dataset, split_predictors,
};
pub use error::{DataError, Result as DataResult, ResultExt};
pub use schema::{FIELD_COUNT, FIELDS, FieldKind, FieldSpec, FieldValue, StudentRecord, field};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};
