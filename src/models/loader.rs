//! Artifact loader for the scaler and classifier

use crate::config::ModelsConfig;
use crate::error::ResourceLoadError;
use crate::models::classifier::Classifier;
use crate::models::forest::RandomForest;
use crate::models::onnx::OnnxClassifier;
use crate::models::scaler::Scaler;
use std::path::Path;
use tracing::{error, info};

/// Loaded, immutable inference resources shared by every batch
pub struct Resources {
    pub scaler: Scaler,
    pub classifier: Box<dyn Classifier>,
}

impl Resources {
    pub fn new(scaler: Scaler, classifier: Box<dyn Classifier>) -> Self {
        Self { scaler, classifier }
    }
}

/// Loader for the scaler and classifier artifacts
pub struct ResourceLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ResourceLoader {
    /// Create a loader with default settings (1 ONNX thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self { onnx_threads }
    }

    /// Load both artifacts named in the configuration, failing on the first error.
    pub fn load(config: &ModelsConfig) -> Result<Resources, ResourceLoadError> {
        let loader = Self::with_threads(config.onnx_threads);
        let result = loader.load_scaler(&config.scaler_path).and_then(|scaler| {
            let classifier = loader.load_classifier(&config.classifier_path)?;
            Ok(Resources::new(scaler, classifier))
        });

        match &result {
            Ok(resources) => info!(
                scaler = %config.scaler_path,
                classifier = %config.classifier_path,
                kind = resources.classifier.kind(),
                "Inference resources loaded"
            ),
            Err(e) => error!(error = %e, "Failed to load inference resources"),
        }

        result
    }

    /// Load the scaler artifact
    pub fn load_scaler<P: AsRef<Path>>(&self, path: P) -> Result<Scaler, ResourceLoadError> {
        let path = Self::require_file(path.as_ref())?;
        Scaler::load(path)
    }

    /// Load the classifier artifact, picking the backend from the file extension
    pub fn load_classifier<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Box<dyn Classifier>, ResourceLoadError> {
        let path = Self::require_file(path.as_ref())?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("onnx") => Ok(Box::new(OnnxClassifier::load(path, self.onnx_threads)?)),
            Some("json") => Ok(Box::new(RandomForest::load(path)?)),
            _ => Err(ResourceLoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    fn require_file(path: &Path) -> Result<&Path, ResourceLoadError> {
        if path.is_file() {
            Ok(path)
        } else {
            Err(ResourceLoadError::Missing {
                path: path.to_path_buf(),
            })
        }
    }
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCALER: &str = r#"{"mean": [0, 0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1, 1]}"#;
    const FOREST: &str = r#"{"n_features": 6, "trees": [{"nodes": [{"value": [1, 3]}]}]}"#;

    fn models_config(dir: &Path, scaler: &str, classifier: &str) -> ModelsConfig {
        ModelsConfig {
            scaler_path: dir.join(scaler).display().to_string(),
            classifier_path: dir.join(classifier).display().to_string(),
            onnx_threads: 1,
        }
    }

    #[test]
    fn test_load_json_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scaler.json"), SCALER).unwrap();
        fs::write(dir.path().join("forest.json"), FOREST).unwrap();

        let resources =
            ResourceLoader::load(&models_config(dir.path(), "scaler.json", "forest.json")).unwrap();

        assert_eq!(resources.classifier.kind(), "random_forest");
        let p = resources.classifier.predict_genuine(&[[0.0; 6]]).unwrap();
        assert_eq!(p, vec![0.75]);
    }

    #[test]
    fn test_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();

        let result = ResourceLoader::load(&models_config(dir.path(), "scaler.json", "forest.json"));
        match result {
            Err(ResourceLoadError::Missing { path }) => assert!(path.ends_with("scaler.json")),
            Err(other) => panic!("expected missing scaler, got {}", other),
            Ok(_) => panic!("expected missing scaler"),
        }

        fs::write(dir.path().join("scaler.json"), SCALER).unwrap();
        let result = ResourceLoader::load(&models_config(dir.path(), "scaler.json", "forest.json"));
        match result {
            Err(ResourceLoadError::Missing { path }) => assert!(path.ends_with("forest.json")),
            Err(other) => panic!("expected missing classifier, got {}", other),
            Ok(_) => panic!("expected missing classifier"),
        }
    }

    #[test]
    fn test_unsupported_and_corrupt_classifier() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scaler.json"), SCALER).unwrap();
        fs::write(dir.path().join("random_forest_model.sav"), b"\x80\x04pickle").unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        let sav = ResourceLoader::load(&models_config(
            dir.path(),
            "scaler.json",
            "random_forest_model.sav",
        ));
        assert!(matches!(sav, Err(ResourceLoadError::UnsupportedFormat { .. })));

        let broken = ResourceLoader::load(&models_config(dir.path(), "scaler.json", "broken.json"));
        assert!(matches!(broken, Err(ResourceLoadError::Corrupt { .. })));
    }
}
