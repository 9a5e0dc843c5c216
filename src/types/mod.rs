//! Type definitions for the banknote authentication service

pub mod banknote;
pub mod prediction;

pub use banknote::{FeatureRow, FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
pub use prediction::{Label, PredictionResponse, PredictionResult, StatsResult, DECISION_THRESHOLD};
