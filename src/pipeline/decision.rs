//! Turning a logit into a labeled decision.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Logit;

/// Probability at or above which an image is labeled real. Matches the
/// training-time decision boundary.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Discrete label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Real,
    Fake,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Real => "real",
            Self::Fake => "fake",
        })
    }
}

/// Outcome of classifying one image.
///
/// `probability_real + probability_fake == 1` and `confidence` is the larger
/// of the two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction: Prediction,
    pub confidence: f64,
    pub probability_real: f64,
    pub probability_fake: f64,
}

/// Logistic function.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Convert the model's raw output into a [`ClassificationResult`].
///
/// Total over finite logits; infinities saturate to probability 0 or 1. A NaN
/// logit yields `Fake` with NaN probabilities, so callers must reject it first
/// (the model executor does).
#[must_use]
pub fn decide(logit: Logit) -> ClassificationResult {
    let probability_real = sigmoid(f64::from(logit));
    let probability_fake = 1.0 - probability_real;

    let (prediction, confidence) = if probability_real >= DECISION_THRESHOLD {
        (Prediction::Real, probability_real)
    } else {
        (Prediction::Fake, probability_fake)
    };

    ClassificationResult {
        prediction,
        confidence,
        probability_real,
        probability_fake,
    }
}
