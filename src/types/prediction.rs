//! Prediction output structures

use serde::{Deserialize, Serialize};

/// Fixed decision threshold on P(genuine). Ties resolve to `Fake`.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Output class of a banknote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Genuine,
    Fake,
}

impl Label {
    /// Label a row from its probability of being genuine (strict `>`)
    pub fn from_genuine_probability(p_genuine: f64) -> Self {
        if p_genuine > DECISION_THRESHOLD {
            Label::Genuine
        } else {
            Label::Fake
        }
    }

    /// Probability of this label given P(genuine)
    pub fn probability_of(self, p_genuine: f64) -> f64 {
        match self {
            Label::Genuine => p_genuine,
            Label::Fake => 1.0 - p_genuine,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Genuine => "Genuine",
            Label::Fake => "Fake",
        }
    }
}

/// Per-row outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 0-based row index within the submitted batch
    pub id: usize,
    /// Predicted class
    pub prediction: Label,
    /// Probability of the predicted class (0.0 - 1.0)
    pub probability: f64,
}

impl PredictionResult {
    /// Build the result for row `id` from its P(genuine)
    pub fn from_genuine_probability(id: usize, p_genuine: f64) -> Self {
        let prediction = Label::from_genuine_probability(p_genuine);
        Self {
            id,
            prediction,
            probability: prediction.probability_of(p_genuine),
        }
    }
}

/// Batch summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    pub total: usize,
    pub genuine: usize,
    pub fake: usize,
    /// Share of genuine rows in percent, 2 decimals
    pub genuine_percentage: f64,
    /// Share of fake rows in percent, 2 decimals
    pub fake_percentage: f64,
}

/// Full response for one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<PredictionResult>,
    pub stats: StatsResult,
}
