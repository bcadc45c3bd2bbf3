//! The styled verdict shown after a prediction.

use evasao_learning::PredictionResult;
use serde::{Deserialize, Serialize};

/// How the verdict is highlighted on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStyle {
    /// Predicted dropout.
    Error,
    /// Predicted graduation.
    Success,
}

impl VerdictStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStyle::Error => "error",
            VerdictStyle::Success => "success",
        }
    }
}

/// Outcome of scoring one submitted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// 1 for dropout, 0 for graduation.
    pub predicted_class: u8,
    /// `"Desistente"` or `"Graduado"`.
    pub label: String,
    /// Probability of the dropout class, in `[0, 1]`.
    pub dropout_probability: f64,
    /// `Probabilidade de evasão: P% (label)`.
    pub message: String,
    pub style: VerdictStyle,
}

impl From<PredictionResult> for Verdict {
    fn from(prediction: PredictionResult) -> Self {
        let style = if prediction.class == 1 {
            VerdictStyle::Error
        } else {
            VerdictStyle::Success
        };
        let message = format!(
            "Probabilidade de evasão: {} ({})",
            format_percent(prediction.dropout_probability),
            prediction.label
        );
        Self {
            predicted_class: prediction.class,
            label: prediction.label,
            dropout_probability: prediction.dropout_probability,
            message,
            style,
        }
    }
}

/// Format a probability as a percentage with two decimals.
///
/// ```
/// assert_eq!(evasao_web::verdict::format_percent(0.1234), "12.34%");
/// ```
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prediction(class: u8, label: &str, p: f64) -> PredictionResult {
        PredictionResult {
            class,
            label: label.to_string(),
            dropout_probability: p,
        }
    }

    #[test]
    fn test_dropout_is_error_styled() {
        let verdict = Verdict::from(prediction(1, "Desistente", 0.87));
        assert_eq!(verdict.style, VerdictStyle::Error);
        assert_eq!(verdict.message, "Probabilidade de evasão: 87.00% (Desistente)");
    }

    #[test]
    fn test_graduate_is_success_styled() {
        let verdict = Verdict::from(prediction(0, "Graduado", 0.05));
        assert_eq!(verdict.style, VerdictStyle::Success);
        assert_eq!(verdict.message, "Probabilidade de evasão: 5.00% (Graduado)");
    }

    #[test]
    fn test_format_percent_bounds() {
        assert_eq!(format_percent(0.0), "0.00%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.5), "50.00%");
        assert_eq!(format_percent(0.1234), "12.34%");
    }

    #[test]
    fn test_serializes_style_lowercase() {
        let verdict = Verdict::from(prediction(1, "Desistente", 0.6));
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["style"], "error");
        assert_eq!(json["predicted_class"], 1);
    }
}
