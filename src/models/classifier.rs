//! Binary classifier contract

use crate::error::ClassifierError;
use crate::types::banknote::FeatureVector;

/// A fitted binary model over {Fake, Genuine}.
///
/// Implementations are immutable after load and shared across requests.
pub trait Classifier: Send + Sync {
    /// Short identifier of the model kind, for logs and health output
    fn kind(&self) -> &'static str;

    /// P(genuine) for each scaled row, in input order
    fn predict_genuine(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ClassifierError>;
}

/// Check a classifier's output against the batch it scored
pub(crate) fn check_probabilities(
    expected: usize,
    probabilities: &[f64],
) -> Result<(), ClassifierError> {
    if probabilities.len() != expected {
        return Err(ClassifierError::LengthMismatch {
            expected,
            got: probabilities.len(),
        });
    }

    if let Some((row, &value)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(ClassifierError::OutOfRange { row, value });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_probabilities() {
        assert!(check_probabilities(2, &[0.0, 1.0]).is_ok());
        assert!(matches!(
            check_probabilities(3, &[0.1, 0.2]),
            Err(ClassifierError::LengthMismatch { expected: 3, got: 2 })
        ));
        assert!(matches!(
            check_probabilities(2, &[0.1, 1.2]),
            Err(ClassifierError::OutOfRange { row: 1, .. })
        ));
        assert!(matches!(
            check_probabilities(1, &[f64::NAN]),
            Err(ClassifierError::OutOfRange { row: 0, .. })
        ));
    }
}
