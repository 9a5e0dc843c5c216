//! ONNX Runtime classifier

use crate::error::{ClassifierError, ResourceLoadError};
use crate::models::classifier::Classifier;
use crate::types::banknote::{FeatureVector, FEATURE_COUNT};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Exported tree ensemble run through ONNX Runtime.
///
/// Accepts a `[N, 6]` float32 input and reads class probabilities either from
/// a `[N, 2]` tensor or from a `seq(map(int64, float))` output.
pub struct OnnxClassifier {
    /// Sessions need exclusive access to run
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output name for probabilities
    output_name: String,
}

impl OnnxClassifier {
    /// Load an ONNX model from file
    pub fn load<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self, ResourceLoadError> {
        let path = path.as_ref();
        let onnx_error = |e: &dyn std::fmt::Display| ResourceLoadError::Onnx {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        info!(path = %path.display(), threads = threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| onnx_error(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| onnx_error(&e))?
            .with_intra_threads(threads)
            .map_err(|e| onnx_error(&e))?
            .commit_from_file(path)
            .map_err(|e| onnx_error(&e))?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs()
            .iter()
            .find(|o| o.name().contains("prob"))
            .or_else(|| session.outputs().last())
            .map(|o| o.name().to_string())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            "ONNX model loaded successfully"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    /// Extract P(genuine) per row from the session outputs
    fn extract_probabilities(
        &self,
        outputs: &SessionOutputs,
        rows: usize,
    ) -> Result<Vec<f64>, ClassifierError> {
        if let Some(output) = outputs.get(self.output_name.as_str()) {
            if let Some(probabilities) = Self::extract_from_value(output, rows)? {
                return Ok(probabilities);
            }
        }

        // Fallback: first non-label output that decodes
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(probabilities) = Self::extract_from_value(&output, rows)? {
                debug!(output = %name, "Extracted probabilities from fallback output");
                return Ok(probabilities);
            }
        }

        Err(ClassifierError::Output(format!(
            "no probability output found (expected '{}')",
            self.output_name
        )))
    }

    /// `Ok(None)` when the value is neither a float tensor nor a sequence of maps
    fn extract_from_value(
        output: &DynValue,
        rows: usize,
    ) -> Result<Option<Vec<f64>>, ClassifierError> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return Self::probabilities_from_tensor(&dims, data, rows).map(Some);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return Self::probabilities_from_sequence_map(output, rows).map(Some);
        }

        Ok(None)
    }

    /// `[N, 2]` tensor: column 1 is Genuine. `[N, 1]` or `[N]`: P(genuine) directly.
    fn probabilities_from_tensor(
        dims: &[i64],
        data: &[f32],
        rows: usize,
    ) -> Result<Vec<f64>, ClassifierError> {
        let columns = match dims {
            [n, c] if *n as usize == rows => *c as usize,
            [n] if *n as usize == rows => 1,
            _ => {
                return Err(ClassifierError::Output(format!(
                    "probability tensor shape {:?} does not fit {} rows",
                    dims, rows
                )))
            }
        };

        match columns {
            1 => Ok(data.iter().map(|&p| p as f64).collect()),
            2 => Ok(data.chunks_exact(2).map(|pair| pair[1] as f64).collect()),
            c => Err(ClassifierError::Output(format!(
                "expected 2 classes, model produced {}",
                c
            ))),
        }
    }

    /// `seq(map(int64, float))`, one map per row
    fn probabilities_from_sequence_map(
        output: &DynValue,
        rows: usize,
    ) -> Result<Vec<f64>, ClassifierError> {
        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| ClassifierError::Output(format!("failed to downcast to sequence: {}", e)))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>()
            .map_err(|e| ClassifierError::Onnx(e.to_string()))?;

        if maps.len() != rows {
            return Err(ClassifierError::LengthMismatch {
                expected: rows,
                got: maps.len(),
            });
        }

        maps.iter()
            .enumerate()
            .map(|(row, map_value)| {
                let kv_pairs = map_value
                    .try_extract_key_values::<i64, f32>()
                    .map_err(|e| ClassifierError::Onnx(e.to_string()))?;

                let genuine = kv_pairs.iter().find(|(class_id, _)| *class_id == 1);
                let fake = kv_pairs.iter().find(|(class_id, _)| *class_id == 0);
                match (genuine, fake) {
                    (Some((_, p)), _) => Ok(*p as f64),
                    (None, Some((_, p))) => Ok(1.0 - *p as f64),
                    (None, None) => Err(ClassifierError::Output(format!(
                        "no class probability in map for row {}",
                        row
                    ))),
                }
            })
            .collect()
    }
}

impl Classifier for OnnxClassifier {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn predict_genuine(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // Prepare input tensor - shape [N, 6]
        let shape = vec![rows.len() as i64, FEATURE_COUNT as i64];
        let data: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| ClassifierError::Onnx(e.to_string()))?;

        let mut session = self.session.lock().map_err(|_| ClassifierError::Poisoned)?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ClassifierError::Onnx(e.to_string()))?;

        self.extract_probabilities(&outputs, rows.len())
    }
}
