//! HTTP endpoint

use crate::error::PipelineError;
use crate::metrics::MetricsSnapshot;
use crate::service::{ErrorBody, ScoringService};
use crate::types::prediction::PredictionResponse;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Request failures rendered as `{"detail", "status"}`
pub enum ApiError {
    Pipeline(PipelineError),
    /// Body could not be read, e.g. over `server.max_body_bytes`
    Body(BytesRejection),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::Pipeline(err) => ErrorBody::from_error(&err),
            ApiError::Body(rejection) => ErrorBody {
                detail: rejection.body_text(),
                status: rejection.status().as_u16(),
            },
        };
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: &'static str,
    timestamp: i64,
}

/// Build the router
pub fn router(service: ScoringService, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Banknote authentication API" }))
}

async fn health(State(service): State<ScoringService>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: service.engine().classifier().kind(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

async fn metrics(State(service): State<ScoringService>) -> Json<MetricsSnapshot> {
    Json(service.metrics().snapshot())
}

/// Score a raw `;`-delimited batch
async fn predict(
    State(service): State<ScoringService>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let body = body.inspect_err(|_| service.metrics().record_rejection("body"))?;
    let response = service.score(body.to_vec()).await?;
    Ok(Json(response))
}
