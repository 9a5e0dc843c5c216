//! Fitted standard scaler

use crate::error::ResourceLoadError;
use crate::types::banknote::{FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// On-disk scaler artifact
#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    #[serde(default)]
    features: Option<Vec<String>>,
    mean: Vec<f64>,
    #[serde(default)]
    scale: Option<Vec<f64>>,
    #[serde(default)]
    var: Option<Vec<f64>>,
}

/// Per-feature affine transform `(raw - mean) / std`, frozen at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    mean: FeatureVector,
    std: FeatureVector,
}

impl Scaler {
    /// Build a scaler from fitted parameters. A zero std leaves the feature unscaled.
    pub fn new(mean: FeatureVector, std: FeatureVector) -> Self {
        Self {
            mean,
            std: std.map(|s| if s == 0.0 { 1.0 } else { s }),
        }
    }

    /// Load a scaler from a JSON artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ResourceLoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ResourceLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let corrupt = |reason: String| ResourceLoadError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let artifact: ScalerArtifact =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;

        if let Some(features) = &artifact.features {
            if features.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
                return Err(corrupt(format!(
                    "feature order {:?} does not match {:?}",
                    features, FEATURE_COLUMNS
                )));
            }
        }

        let mean = to_vector("mean", artifact.mean).map_err(corrupt)?;
        let std = match (artifact.scale, artifact.var) {
            (Some(scale), _) => to_vector("scale", scale).map_err(corrupt)?,
            (None, Some(var)) => {
                let var = to_vector("var", var).map_err(corrupt)?;
                if var.iter().any(|&v| v < 0.0) {
                    return Err(corrupt("negative variance".to_string()));
                }
                var.map(f64::sqrt)
            }
            (None, None) => return Err(corrupt("neither 'scale' nor 'var' present".to_string())),
        };

        info!(path = %path.display(), mean = ?mean, std = ?std, "Scaler loaded");

        Ok(Self::new(mean, std))
    }

    /// Scale one feature vector
    pub fn transform(&self, raw: &FeatureVector) -> FeatureVector {
        std::array::from_fn(|i| (raw[i] - self.mean[i]) / self.std[i])
    }

    /// Scale a batch of feature vectors
    pub fn transform_batch(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|row| self.transform(row)).collect()
    }

    pub fn mean(&self) -> &FeatureVector {
        &self.mean
    }

    pub fn std(&self) -> &FeatureVector {
        &self.std
    }
}

fn to_vector(name: &str, values: Vec<f64>) -> Result<FeatureVector, String> {
    let len = values.len();
    let vector: FeatureVector = values
        .try_into()
        .map_err(|_| format!("'{}' has {} values, expected {}", name, len, FEATURE_COUNT))?;

    if vector.iter().any(|v| !v.is_finite()) {
        return Err(format!("'{}' contains non-finite values", name));
    }

    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_artifact(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_transform() {
        let scaler = Scaler::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0], [2.0, 2.0, 2.0, 2.0, 2.0, 0.5]);
        let scaled = scaler.transform(&[3.0, 2.0, 1.0, 4.0, 5.0, 7.0]);
        assert_eq!(scaled, [1.0, 0.0, -1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_zero_std_is_unscaled() {
        let scaler = Scaler::new([0.0; 6], [0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(scaler.std()[0], 1.0);
        assert_eq!(scaler.transform(&[5.0; 6])[0], 5.0);
    }

    #[test]
    fn test_load_with_scale() {
        let file = write_artifact(
            r#"{
                "features": ["diagonal", "height_left", "height_right", "margin_low", "margin_up", "length"],
                "mean": [171.96, 104.03, 103.92, 4.48, 3.15, 112.68],
                "scale": [0.31, 0.30, 0.33, 0.66, 0.23, 0.87]
            }"#,
        );

        let scaler = Scaler::load(file.path()).unwrap();
        assert_eq!(scaler.mean()[0], 171.96);
        assert_eq!(scaler.std()[5], 0.87);
    }

    #[test]
    fn test_load_with_variance() {
        let file = write_artifact(r#"{"mean": [0, 0, 0, 0, 0, 0], "var": [4, 9, 16, 1, 0.25, 0]}"#);

        let scaler = Scaler::load(file.path()).unwrap();
        assert_eq!(scaler.std(), &[2.0, 3.0, 4.0, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_load_rejects_bad_artifacts() {
        let short = write_artifact(r#"{"mean": [0, 0, 0], "scale": [1, 1, 1]}"#);
        assert!(matches!(
            Scaler::load(short.path()),
            Err(ResourceLoadError::Corrupt { .. })
        ));

        let reordered = write_artifact(
            r#"{"features": ["length", "height_left", "height_right", "margin_low", "margin_up", "diagonal"],
                "mean": [0, 0, 0, 0, 0, 0], "scale": [1, 1, 1, 1, 1, 1]}"#,
        );
        assert!(matches!(
            Scaler::load(reordered.path()),
            Err(ResourceLoadError::Corrupt { .. })
        ));

        let garbage = write_artifact("not json");
        assert!(matches!(
            Scaler::load(garbage.path()),
            Err(ResourceLoadError::Corrupt { .. })
        ));

        let no_scale = write_artifact(r#"{"mean": [0, 0, 0, 0, 0, 0]}"#);
        assert!(Scaler::load(no_scale.path()).is_err());
    }
}
