//! Banknote Authentication Service - Main Entry Point
//!
//! Loads the scaler and classifier once, then scores CSV batches over HTTP and,
//! when enabled, NATS request/reply. Refuses to start if either artifact fails
//! to load.

use anyhow::{Context, Result};
use banknote_authenticator::{
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    consumer::BatchConsumer,
    metrics::{MetricsReporter, ServiceMetrics},
    models::{InferenceEngine, ResourceLoader},
    producer::ReplyProducer,
    server,
    service::ScoringService,
    FeatureExtractor,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Load configuration
    let config = AppConfig::load_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    init_logging(&config.logging)?;

    info!("Starting Banknote Authentication Service");
    info!(path = %config_path, "Configuration loaded successfully");

    // Load scaler and classifier; no model means nothing to serve
    let extractor = FeatureExtractor::with_fallback(config.pipeline.fallback_encoding()?);
    let resources = ResourceLoader::load(&config.models)
        .context("Failed to load inference resources")?;
    let engine = Arc::new(InferenceEngine::with_extractor(resources, extractor));
    info!(
        classifier = engine.classifier().kind(),
        fallback_encoding = engine.extractor().fallback_encoding(),
        "Inference engine initialized"
    );

    // Initialize metrics
    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let service = ScoringService::new(
        engine,
        metrics.clone(),
        config.pipeline.workers,
        Duration::from_millis(config.pipeline.timeout_ms),
    );
    info!(
        workers = config.pipeline.workers,
        timeout_ms = config.pipeline.timeout_ms,
        "Scoring service ready"
    );

    // Connect to NATS
    if config.nats.enabled {
        let client = async_nats::connect(&config.nats.url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
        info!("Connected to NATS at {}", config.nats.url);

        let consumer = BatchConsumer::new(
            client.clone(),
            &config.nats.request_subject,
            &config.nats.queue_group,
        );
        let producer = ReplyProducer::new(client);
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = consumer.serve(service, producer).await {
                error!(error = %e, "NATS consumer stopped");
            }
        });
    }

    // Start HTTP server
    let app = server::router(service, config.server.max_body_bytes);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

/// Initialize logging from the logging section
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "banknote_authenticator={},tower_http={}",
            logging.level, logging.level
        ))
    })?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
