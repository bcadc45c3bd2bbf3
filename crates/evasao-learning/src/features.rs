//! Raw predictor values pulled out of a DataFrame.
//!
//! [`ColumnLayout`] records which predictors are numeric and which are
//! categorical; it is fixed at training time and persisted with the model so
//! that serving reads the same columns in the same order. [`FeatureTable`] is
//! the column-major copy of those predictors that the preprocessing and the
//! cross-validation folds work on, without going back to polars for every
//! row subset.

use evasao_data::dataset::ColumnTyping;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LearningError, Result};

/// Ordered predictor columns split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnLayout {
    #[must_use]
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    /// Total number of raw predictor columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.categorical.is_empty()
    }
}

impl From<&ColumnTyping> for ColumnLayout {
    fn from(typing: &ColumnTyping) -> Self {
        Self::new(typing.numeric.clone(), typing.categorical.clone())
    }
}

/// Column-major predictor values, in [`ColumnLayout`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    n_rows: usize,
    numeric: Vec<Vec<f64>>,
    categorical: Vec<Vec<String>>,
}

impl FeatureTable {
    /// Extract the layout's columns from `df`.
    ///
    /// Columns of `df` that are not in the layout are ignored.
    ///
    /// # Errors
    ///
    /// - [`LearningError::MissingColumn`] if a layout column is absent
    /// - [`LearningError::InvalidData`] if a value is null or a numeric
    ///   column cannot be read as numbers
    pub fn from_dataframe(df: &DataFrame, layout: &ColumnLayout) -> Result<Self> {
        let numeric = layout
            .numeric
            .iter()
            .map(|name| numeric_values(df, name))
            .collect::<Result<Vec<_>>>()?;
        let categorical = layout
            .categorical
            .iter()
            .map(|name| categorical_values(df, name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            n_rows: df.height(),
            numeric,
            categorical,
        })
    }

    /// Build a table directly from columns.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if column lengths differ.
    pub fn from_columns(numeric: Vec<Vec<f64>>, categorical: Vec<Vec<String>>) -> Result<Self> {
        let n_rows = numeric
            .first()
            .map(Vec::len)
            .or_else(|| categorical.first().map(Vec::len))
            .unwrap_or(0);
        let ragged = numeric.iter().any(|c| c.len() != n_rows)
            || categorical.iter().any(|c| c.len() != n_rows);
        if ragged {
            return Err(LearningError::InvalidData(
                "feature columns have different lengths".to_string(),
            ));
        }
        Ok(Self {
            n_rows,
            numeric,
            categorical,
        })
    }

    /// Copy of the given rows, in the order given.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            n_rows: rows.len(),
            numeric: self
                .numeric
                .iter()
                .map(|col| rows.iter().map(|&r| col[r]).collect())
                .collect(),
            categorical: self
                .categorical
                .iter()
                .map(|col| rows.iter().map(|&r| col[r].clone()).collect())
                .collect(),
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn numeric_columns(&self) -> &[Vec<f64>] {
        &self.numeric
    }

    pub fn categorical_columns(&self) -> &[Vec<String>] {
        &self.categorical
    }
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| LearningError::MissingColumn(name.to_string()))
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let source = column(df, name)?.as_materialized_series();
    let source_nulls = source.null_count();
    let cast = source.cast(&DataType::Float64)?;

    if cast.null_count() > source_nulls {
        return Err(LearningError::InvalidData(format!(
            "column '{name}' contains values that are not numbers"
        )));
    }

    cast.f64()?
        .into_iter()
        .map(|value| {
            value.ok_or_else(|| {
                LearningError::InvalidData(format!("column '{name}' contains null values"))
            })
        })
        .collect()
}

fn categorical_values(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let cast = column(df, name)?
        .as_materialized_series()
        .cast(&DataType::String)?;

    cast.str()?
        .into_iter()
        .map(|value| {
            value.map(str::to_string).ok_or_else(|| {
                LearningError::InvalidData(format!("column '{name}' contains null values"))
            })
        })
        .collect()
}
