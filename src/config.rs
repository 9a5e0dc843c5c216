//! Configuration management for the banknote authentication service

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub models: ModelsConfig,
    pub server: ServerConfig,
    pub nats: NatsConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Fitted scaler (JSON)
    pub scaler_path: String,
    /// Fitted classifier (.onnx or .json)
    pub classifier_path: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_onnx_threads() -> usize {
    1
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

/// NATS request/reply configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// Serve batches over NATS in addition to HTTP
    #[serde(default)]
    pub enabled: bool,
    /// NATS server URL
    pub url: String,
    /// Subject carrying CSV batches
    pub request_subject: String,
    /// Queue group shared by service instances
    pub queue_group: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum batches scored concurrently
    pub workers: usize,
    /// Per-batch timeout in milliseconds
    pub timeout_ms: u64,
    /// Encoding tried when a payload is not valid UTF-8
    #[serde(default = "default_fallback_encoding")]
    pub fallback_encoding: String,
}

fn default_fallback_encoding() -> String {
    "windows-1252".to_string()
}

impl PipelineConfig {
    /// Resolve the fallback encoding by its WHATWG label
    pub fn fallback_encoding(&self) -> Result<&'static encoding_rs::Encoding> {
        encoding_rs::Encoding::for_label(self.fallback_encoding.as_bytes())
            .with_context(|| format!("Unknown fallback encoding '{}'", self.fallback_encoding))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between logged summaries, 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path, overlaid with `BANKNOTE__*` env vars
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("BANKNOTE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            bail!("pipeline.workers must be at least 1");
        }
        if self.pipeline.timeout_ms == 0 {
            bail!("pipeline.timeout_ms must be positive");
        }
        if self.models.onnx_threads == 0 {
            bail!("models.onnx_threads must be at least 1");
        }
        self.pipeline.fallback_encoding()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig {
                scaler_path: "models/scaler.json".to_string(),
                classifier_path: "models/random_forest.json".to_string(),
                onnx_threads: 1,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                max_body_bytes: default_max_body_bytes(),
            },
            nats: NatsConfig {
                enabled: false,
                url: "nats://localhost:4222".to_string(),
                request_subject: "banknotes.predict".to_string(),
                queue_group: "banknote-authenticator".to_string(),
            },
            pipeline: PipelineConfig {
                workers: 4,
                timeout_ms: 5000,
                fallback_encoding: default_fallback_encoding(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            metrics: MetricsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.nats.request_subject, "banknotes.predict");
        assert!(!config.nats.enabled);
        assert_eq!(config.pipeline.workers, 4);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.pipeline.fallback_encoding().unwrap(),
            encoding_rs::WINDOWS_1252
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.pipeline.workers = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.fallback_encoding = "klingon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
[models]
scaler_path = "artifacts/scaler.json"
classifier_path = "artifacts/forest.onnx"

[server]
host = "127.0.0.1"
port = 9000

[nats]
url = "nats://nats:4222"
request_subject = "notes"
queue_group = "workers"

[pipeline]
workers = 2
timeout_ms = 250

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.models.classifier_path, "artifacts/forest.onnx");
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_body_bytes, 10 * 1024 * 1024);
        assert!(!config.nats.enabled);
        assert_eq!(config.pipeline.fallback_encoding, "windows-1252");
        assert_eq!(config.metrics.report_interval_secs, 60);
        assert_eq!(config.logging.format, "json");
    }
}
