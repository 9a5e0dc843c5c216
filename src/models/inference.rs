//! Batch inference engine for banknote authentication

use crate::config::ModelsConfig;
use crate::error::{PipelineError, ResourceLoadError};
use crate::feature_extractor::FeatureExtractor;
use crate::models::aggregator::StatsAggregator;
use crate::models::classifier::{check_probabilities, Classifier};
use crate::models::loader::{ResourceLoader, Resources};
use crate::models::scaler::Scaler;
use crate::types::banknote::{FeatureRow, FeatureVector};
use crate::types::prediction::{PredictionResponse, PredictionResult};
use std::time::Instant;
use tracing::{debug, info};

/// Scores batches of banknotes with a fixed scaler and classifier.
///
/// Stateless after construction: `infer` only reads the shared resources, so
/// one engine can serve concurrent batches without locking.
pub struct InferenceEngine {
    resources: Resources,
    extractor: FeatureExtractor,
}

impl InferenceEngine {
    /// Create an engine from already loaded resources
    pub fn new(resources: Resources) -> Self {
        Self::with_extractor(resources, FeatureExtractor::new())
    }

    /// Create an engine with a custom input extractor
    pub fn with_extractor(resources: Resources, extractor: FeatureExtractor) -> Self {
        Self {
            resources,
            extractor,
        }
    }

    /// Load resources from configuration and build the engine in one step
    pub fn from_config(config: &ModelsConfig) -> Result<Self, ResourceLoadError> {
        ResourceLoader::load(config).map(Self::new)
    }

    pub fn scaler(&self) -> &Scaler {
        &self.resources.scaler
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.resources.classifier.as_ref()
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Score a batch: scale, classify, label with the 0.5 threshold, aggregate.
    ///
    /// Row ids are 0-based positions in `rows`. An empty batch returns no
    /// predictions and all-zero stats.
    pub fn infer(&self, rows: &[FeatureRow]) -> Result<PredictionResponse, PipelineError> {
        let start_time = Instant::now();

        if rows.is_empty() {
            debug!("Empty batch, nothing to score");
            return Ok(PredictionResponse::default());
        }

        let raw: Vec<FeatureVector> = rows.iter().map(FeatureRow::to_array).collect();
        let scaled = self.resources.scaler.transform_batch(&raw);

        let p_genuine = self.resources.classifier.predict_genuine(&scaled)?;
        check_probabilities(rows.len(), &p_genuine)?;

        let predictions: Vec<PredictionResult> = p_genuine
            .iter()
            .enumerate()
            .map(|(id, &p)| PredictionResult::from_genuine_probability(id, p))
            .collect();

        let stats = StatsAggregator::aggregate(&predictions);

        debug!(
            genuine = stats.genuine,
            fake = stats.fake,
            genuine_percentage = stats.genuine_percentage,
            "Batch aggregated"
        );
        info!(
            rows = stats.total,
            classifier = self.resources.classifier.kind(),
            processing_time_us = start_time.elapsed().as_micros() as u64,
            "Batch scored"
        );

        Ok(PredictionResponse { predictions, stats })
    }

    /// Decode, validate and score a raw `;`-delimited payload
    pub fn infer_payload(&self, bytes: &[u8]) -> Result<PredictionResponse, PipelineError> {
        let rows = self.extractor.extract_payload(bytes)?;
        self.infer(&rows)
    }
}
