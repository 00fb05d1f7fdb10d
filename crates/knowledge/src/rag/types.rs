//! RAG answer types.

use ragline_core::config::AnswerSettings;
use serde::{Deserialize, Serialize};

/// The canonical answer returned for every successful question.
///
/// `answer` is never empty and `confidence` is always within [0.0, 1.0].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: f64,
}

/// Constants used when normalizing model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerPolicy {
    /// Confidence when the model omits or garbles `confidence`
    pub default_confidence: f64,

    /// Confidence of an answer extracted from the retrieved context
    pub fallback_confidence: f64,

    /// Confidence of the refusal answer
    pub refusal_confidence: f64,

    /// Maximum characters of context used as a fallback answer
    pub fallback_max_chars: usize,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self {
            default_confidence: 0.6,
            fallback_confidence: 0.4,
            refusal_confidence: 0.1,
            fallback_max_chars: 700,
        }
    }
}

impl From<&AnswerSettings> for AnswerPolicy {
    fn from(settings: &AnswerSettings) -> Self {
        let defaults = Self::default();
        Self {
            default_confidence: clamp_or(settings.default_confidence, defaults.default_confidence),
            fallback_confidence: clamp_or(
                settings.fallback_confidence,
                defaults.fallback_confidence,
            ),
            refusal_confidence: clamp_or(settings.refusal_confidence, defaults.refusal_confidence),
            fallback_max_chars: settings.fallback_max_chars,
        }
    }
}

fn clamp_or(value: f64, default: f64) -> f64 {
    if value.is_nan() {
        default
    } else {
        clamp_confidence(value)
    }
}

/// Clamp into [0.0, 1.0]. NaN maps to 0.0; callers substitute a default first.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
