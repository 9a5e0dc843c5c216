//! Banknote feature rows

use serde::{Deserialize, Serialize};

/// Number of measured features per banknote
pub const FEATURE_COUNT: usize = 6;

/// Required columns, in the order the scaler and classifier were fitted on.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "diagonal",
    "height_left",
    "height_right",
    "margin_low",
    "margin_up",
    "length",
];

/// Feature vector in canonical column order
pub type FeatureVector = [f64; FEATURE_COUNT];

/// One banknote sample, geometric measurements in millimetres.
///
/// No range checks are applied: out-of-range measurements are scored, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Diagonal length
    pub diagonal: f64,
    /// Height measured on the left edge
    pub height_left: f64,
    /// Height measured on the right edge
    pub height_right: f64,
    /// Margin between the lower edge and the image
    pub margin_low: f64,
    /// Margin between the upper edge and the image
    pub margin_up: f64,
    /// Length of the note
    pub length: f64,
}

impl FeatureRow {
    /// Build a row from values given in canonical column order
    pub fn from_array(values: FeatureVector) -> Self {
        let [diagonal, height_left, height_right, margin_low, margin_up, length] = values;
        Self {
            diagonal,
            height_left,
            height_right,
            margin_low,
            margin_up,
            length,
        }
    }

    /// Project the row onto the canonical feature order
    pub fn to_array(&self) -> FeatureVector {
        [
            self.diagonal,
            self.height_left,
            self.height_right,
            self.margin_low,
            self.margin_up,
            self.length,
        ]
    }
}
