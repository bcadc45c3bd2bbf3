//! Feature preprocessing: numeric scaling and categorical one-hot expansion.
//!
//! [`ColumnTransformer`] applies a [`StandardScaler`] to the numeric block
//! and a [`OneHotEncoder`] to the categorical block, then lays the results
//! side by side: every numeric column first, then the indicator columns of
//! each categorical column in turn.
//!
//! Categories not seen during fitting encode as all zeros; this never fails.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LearningError, Result};
use crate::features::{ColumnLayout, FeatureTable};
use crate::matrix::Matrix;

/// Per-column standardization to zero mean and unit variance.
///
/// Uses the population standard deviation. A constant column keeps a scale
/// of 1, so it transforms to all zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Learn mean and scale of each column.
    #[must_use]
    pub fn fit(columns: &[Vec<f64>]) -> Self {
        let (means, scales) = columns
            .iter()
            .map(|values| {
                if values.is_empty() {
                    return (0.0, 1.0);
                }
                if values.iter().all(|v| *v == values[0]) {
                    return (values[0], 1.0);
                }
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = variance.sqrt();
                (mean, if std > 0.0 { std } else { 1.0 })
            })
            .unzip();
        Self { means, scales }
    }

    #[inline]
    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        (value - self.means[column]) / self.scales[column]
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn n_columns(&self) -> usize {
        self.means.len()
    }
}

/// One-hot expansion over the categories seen at fit time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted, de-duplicated categories per column.
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    #[must_use]
    pub fn fit(columns: &[Vec<String>]) -> Self {
        let categories = columns
            .iter()
            .map(|values| {
                let mut seen: Vec<String> = values.clone();
                seen.sort_unstable();
                seen.dedup();
                seen
            })
            .collect();
        Self { categories }
    }

    /// Position of `value` among the categories of `column`, if seen at fit time.
    pub fn category_index(&self, column: usize, value: &str) -> Option<usize> {
        self.categories[column]
            .binary_search_by(|category| category.as_str().cmp(value))
            .ok()
    }

    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    /// Number of indicator columns produced.
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub(crate) fn from_categories(categories: Vec<Vec<String>>) -> Self {
        Self { categories }
    }
}

/// Fitted preprocessing for a fixed [`ColumnLayout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    layout: ColumnLayout,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl ColumnTransformer {
    /// Fit scaler and encoder on `table`.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if the table does not match
    /// the layout.
    pub fn fit(table: &FeatureTable, layout: &ColumnLayout) -> Result<Self> {
        check_shape(table, layout)?;
        let scaler = StandardScaler::fit(table.numeric_columns());
        let encoder = OneHotEncoder::fit(table.categorical_columns());
        debug!(
            numeric = scaler.n_columns(),
            indicators = encoder.n_outputs(),
            "Fitted column transformer"
        );
        Ok(Self {
            layout: layout.clone(),
            scaler,
            encoder,
        })
    }

    /// Transform `table` into a dense matrix.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if the table does not match
    /// the fitted layout.
    pub fn transform(&self, table: &FeatureTable) -> Result<Matrix> {
        check_shape(table, &self.layout)?;

        let n_numeric = self.scaler.n_columns();
        let mut out = Matrix::zeros(table.n_rows(), self.n_outputs());

        for (col, values) in table.numeric_columns().iter().enumerate() {
            for (row, value) in values.iter().enumerate() {
                out.set(row, col, self.scaler.transform_value(col, *value));
            }
        }

        let mut offset = n_numeric;
        for (col, values) in table.categorical_columns().iter().enumerate() {
            for (row, value) in values.iter().enumerate() {
                if let Some(index) = self.encoder.category_index(col, value) {
                    out.set(row, offset + index, 1.0);
                }
            }
            offset += self.encoder.categories()[col].len();
        }

        Ok(out)
    }

    /// Fit on `table` and return its transformation.
    ///
    /// # Errors
    ///
    /// See [`fit`](Self::fit).
    pub fn fit_transform(table: &FeatureTable, layout: &ColumnLayout) -> Result<(Self, Matrix)> {
        let transformer = Self::fit(table, layout)?;
        let matrix = transformer.transform(table)?;
        Ok((transformer, matrix))
    }

    /// Output column names: numeric names, then `Column_value` per category.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.layout.numeric.clone();
        for (column, categories) in self
            .layout
            .categorical
            .iter()
            .zip(self.encoder.categories())
        {
            names.extend(categories.iter().map(|value| format!("{column}_{value}")));
        }
        names
    }

    pub fn n_outputs(&self) -> usize {
        self.scaler.n_columns() + self.encoder.n_outputs()
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    #[cfg(test)]
    pub(crate) fn with_encoder(mut self, encoder: OneHotEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Check that scaler and encoder cover the layout and that categories are
    /// strictly sorted, as [`OneHotEncoder::category_index`] searches them.
    pub(crate) fn check_structure(&self) -> std::result::Result<(), String> {
        let numeric = self.layout.numeric.len();
        if self.scaler.means.len() != numeric || self.scaler.scales.len() != numeric {
            return Err(format!(
                "scaler covers {} columns, layout has {numeric}",
                self.scaler.means.len()
            ));
        }
        if self.encoder.categories.len() != self.layout.categorical.len() {
            return Err(format!(
                "encoder covers {} columns, layout has {}",
                self.encoder.categories.len(),
                self.layout.categorical.len()
            ));
        }
        for (column, categories) in self.layout.categorical.iter().zip(&self.encoder.categories) {
            if categories.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(format!("categories of {column} are not sorted"));
            }
        }
        Ok(())
    }
}

fn check_shape(table: &FeatureTable, layout: &ColumnLayout) -> Result<()> {
    if table.numeric_columns().len() != layout.numeric.len()
        || table.categorical_columns().len() != layout.categorical.len()
    {
        return Err(LearningError::InvalidData(format!(
            "expected {} numeric and {} categorical columns, got {} and {}",
            layout.numeric.len(),
            layout.categorical.len(),
            table.numeric_columns().len(),
            table.categorical_columns().len()
        )));
    }
    Ok(())
}
