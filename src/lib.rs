//! Banknote Authentication Service Library
//!
//! Classifies banknotes as genuine or fake from six geometric measurements,
//! using a pre-fitted scaler and tree-ensemble classifier loaded at startup.
//! Batches arrive as `;`-delimited tables over HTTP or NATS.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod server;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use consumer::BatchConsumer;
pub use error::{ClassifierError, PipelineError, ResourceLoadError};
pub use feature_extractor::FeatureExtractor;
pub use models::inference::InferenceEngine;
pub use producer::ReplyProducer;
pub use service::ScoringService;
pub use types::{FeatureRow, Label, PredictionResponse, PredictionResult, StatsResult};
