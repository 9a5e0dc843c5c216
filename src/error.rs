//! Error types for artifact loading and batch inference

use std::path::PathBuf;
use thiserror::Error;

/// Scaler or classifier artifact could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum ResourceLoadError {
    #[error("artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt artifact {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("unsupported classifier format: {} (expected .onnx or .json)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to create ONNX session from {}: {reason}", path.display())]
    Onnx { path: PathBuf, reason: String },
}

/// Failure inside a classifier implementation
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("ONNX inference failed: {0}")]
    Onnx(String),

    #[error("classifier returned {got} probabilities for {expected} rows")]
    LengthMismatch { expected: usize, got: usize },

    #[error("classifier returned probability {value} for row {row}, outside [0, 1]")]
    OutOfRange { row: usize, value: f64 },

    #[error("unexpected classifier output: {0}")]
    Output(String),

    #[error("classifier session lock poisoned")]
    Poisoned,
}

/// Failure while scoring one batch
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input could not be decoded as UTF-8 or {fallback}")]
    Decoding { fallback: &'static str },

    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("non-numeric value {value:?} in column '{column}' at row {row}")]
    TypeConversion {
        row: usize,
        column: String,
        value: String,
    },

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("inference did not finish within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// True for errors caused by the submitted batch rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Decoding { .. }
                | PipelineError::Schema { .. }
                | PipelineError::TypeConversion { .. }
                | PipelineError::Malformed(_)
        )
    }

    /// Short stable name, used as a metrics key
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Decoding { .. } => "decoding",
            PipelineError::Schema { .. } => "schema",
            PipelineError::TypeConversion { .. } => "type_conversion",
            PipelineError::Malformed(_) => "malformed",
            PipelineError::Classifier(_) => "classifier",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::Internal(_) => "internal",
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Malformed(err.to_string())
    }
}
