//! Transport-independent scoring service.
//!
//! Wraps the [`InferenceEngine`] with the boundary concerns shared by the HTTP
//! and NATS endpoints: bounded concurrency, a per-batch timeout, metrics and
//! the mapping of failures to client or server error responses.

use crate::error::PipelineError;
use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use crate::types::prediction::PredictionResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Error payload returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason
    pub detail: String,
    /// HTTP-style status code
    pub status: u16,
}

impl ErrorBody {
    /// Client errors carry their reason; server errors never leak internals.
    pub fn from_error(err: &PipelineError) -> Self {
        if err.is_client_error() {
            return Self {
                detail: err.to_string(),
                status: 400,
            };
        }

        match err {
            PipelineError::Timeout { .. } => Self {
                detail: "Inference timed out".to_string(),
                status: 504,
            },
            _ => Self {
                detail: "Internal server error".to_string(),
                status: 500,
            },
        }
    }
}

/// Shared handle scoring raw batches
#[derive(Clone)]
pub struct ScoringService {
    engine: Arc<InferenceEngine>,
    metrics: Arc<ServiceMetrics>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl ScoringService {
    pub fn new(
        engine: Arc<InferenceEngine>,
        metrics: Arc<ServiceMetrics>,
        workers: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            metrics,
            permits: Arc::new(Semaphore::new(workers)),
            timeout,
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    /// Wait for a free worker slot.
    ///
    /// The slot is held until the batch scored under it has actually finished,
    /// even when the caller has already given up on it.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, PipelineError> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))
    }

    /// Score one raw `;`-delimited batch on the blocking pool.
    pub async fn score(&self, payload: Vec<u8>) -> Result<PredictionResponse, PipelineError> {
        let permit = self.acquire().await?;
        self.score_with_permit(permit, payload).await
    }

    /// Score a batch under a slot taken earlier with [`ScoringService::acquire`].
    pub async fn score_with_permit(
        &self,
        permit: OwnedSemaphorePermit,
        payload: Vec<u8>,
    ) -> Result<PredictionResponse, PipelineError> {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();
        let payload_bytes = payload.len();

        let result = self.run_bounded(permit, payload).await;
        let processing_time = start_time.elapsed();

        match &result {
            Ok(response) => {
                self.metrics.record_batch(processing_time, response);
                info!(
                    request_id = %request_id,
                    rows = response.stats.total,
                    genuine = response.stats.genuine,
                    fake = response.stats.fake,
                    payload_bytes = payload_bytes,
                    processing_time_us = processing_time.as_micros() as u64,
                    "Batch processed"
                );
            }
            Err(e) => {
                self.metrics.record_rejection(e.kind());
                if e.is_client_error() {
                    warn!(request_id = %request_id, error = %e, "Batch rejected");
                } else {
                    error!(request_id = %request_id, error = %e, "Batch failed");
                }
            }
        }

        result
    }

    async fn run_bounded(
        &self,
        permit: OwnedSemaphorePermit,
        payload: Vec<u8>,
    ) -> Result<PredictionResponse, PipelineError> {
        let engine = self.engine.clone();
        // The permit moves into the job so a timed-out batch keeps its slot
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            engine.infer_payload(&payload)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(PipelineError::Internal(join_error.to_string())),
            Err(_) => Err(PipelineError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
