//! Scaler, classifier and batch inference components

pub mod aggregator;
pub mod classifier;
pub mod forest;
pub mod inference;
pub mod loader;
pub mod onnx;
pub mod scaler;

pub use aggregator::StatsAggregator;
pub use classifier::Classifier;
pub use forest::RandomForest;
pub use inference::InferenceEngine;
pub use loader::{ResourceLoader, Resources};
pub use onnx::OnnxClassifier;
pub use scaler::Scaler;
