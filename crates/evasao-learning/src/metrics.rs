//! Evaluation metrics for the binary dropout classifier.
//!
//! - [`roc_auc`]: area under the ROC curve from dropout scores
//! - [`ConfusionMatrix`]: counts of true/false positives and negatives
//! - [`ClassificationReport`]: per-class precision, recall and F1
//! - [`mean_std`]: summary of cross-validation scores

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LearningError, Result};

/// Area under the ROC curve.
///
/// Computed as the Mann–Whitney U statistic: the probability that a random
/// dropout row scores higher than a random graduate row, counting ties as
/// one half.
///
/// # Errors
///
/// Returns [`LearningError::InvalidData`] if the lengths differ or only one
/// class is present.
///
/// # Example
///
/// ```
/// use evasao_learning::metrics::roc_auc;
///
/// let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
/// assert!((auc - 0.75).abs() < 1e-12);
/// ```
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Result<f64> {
    if labels.len() != scores.len() {
        return Err(LearningError::InvalidData(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(LearningError::InvalidData(
            "only one class present in labels; ROC AUC is undefined".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // 1-based ranks, ties share their average rank
    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let average_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end]
            .iter()
            .filter(|&&i| labels[i] == 1)
            .count();
        positive_rank_sum += average_rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Mean and population standard deviation. `(0.0, 0.0)` for no values.
#[must_use]
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// 2×2 confusion matrix `[[tn, fp], [fn, tp]]`; rows are the true label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub matrix: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Count outcomes of `predictions` against `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if the lengths differ.
    pub fn from_predictions(labels: &[u8], predictions: &[u8]) -> Result<Self> {
        if labels.len() != predictions.len() {
            return Err(LearningError::InvalidData(format!(
                "{} labels but {} predictions",
                labels.len(),
                predictions.len()
            )));
        }
        let mut matrix = [[0usize; 2]; 2];
        for (truth, predicted) in labels.iter().zip(predictions) {
            matrix[usize::from(*truth == 1)][usize::from(*predicted == 1)] += 1;
        }
        Ok(Self { matrix })
    }

    pub fn true_negatives(&self) -> usize {
        self.matrix[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.matrix[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.matrix[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.matrix[1][1]
    }

    /// Number of rows whose true label is `class`.
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class][0] + self.matrix[class][1]
    }

    pub fn total(&self) -> usize {
        self.support(0) + self.support(1)
    }
}

impl fmt::Display for ConfusionMatrix {
    /// Renders as a bracketed grid with right-aligned counts:
    ///
    /// ```text
    /// [[110  10]
    ///  [ 12  68]]
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .matrix
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);
        let [[tn, fp], [fn_, tp]] = self.matrix;
        writeln!(f, "[[{tn:>width$} {fp:>width$}]")?;
        write!(f, " [{fn_:>width$} {tp:>width$}]]")
    }
}

/// Precision, recall, F1 and support of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Averages across classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Per-class report over classes `0` (graduate) and `1` (dropout).
///
/// Divisions by zero yield 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub support: usize,
}

impl ClassificationReport {
    #[must_use]
    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = (0..2)
            .map(|class| {
                let tp = matrix.matrix[class][class];
                let predicted = matrix.matrix[0][class] + matrix.matrix[1][class];
                let actual = matrix.support(class);
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, actual);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: class.to_string(),
                    precision,
                    recall,
                    f1_score,
                    support: actual,
                }
            })
            .collect();

        let total = matrix.total();
        let n_classes = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n_classes,
        };
        let weight = |c: &ClassMetrics| ratio(c.support, total);
        let weighted_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall: classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1_score: classes.iter().map(|c| c.f1_score * weight(c)).sum(),
        };

        Self {
            classes,
            accuracy: ratio(matrix.true_negatives() + matrix.true_positives(), total),
            macro_avg,
            weighted_avg,
            support: total,
        }
    }

    /// Build from labels and predictions.
    ///
    /// # Errors
    ///
    /// See [`ConfusionMatrix::from_predictions`].
    pub fn from_predictions(labels: &[u8], predictions: &[u8]) -> Result<Self> {
        Ok(Self::from_confusion(&ConfusionMatrix::from_predictions(
            labels,
            predictions,
        )?))
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const W: usize = 12;
        writeln!(
            f,
            "{:>W$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>W$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.label, class.precision, class.recall, class.f1_score, class.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>W$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.support
        )?;
        for (name, avg) in [
            ("macro avg", &self.macro_avg),
            ("weighted avg", &self.weighted_avg),
        ] {
            writeln!(
                f,
                "{:>W$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, self.support
            )?;
        }
        Ok(())
    }
}
