//! Feature extraction from delimited banknote batches.
//!
//! Turns raw request bytes into [`FeatureRow`]s: decode the payload (UTF-8
//! with a single fallback encoding), parse the `;`-delimited table, check that
//! every required column is present and convert the required cells to `f64`.
//! Extra columns are ignored and column order in the input is irrelevant.

use crate::error::PipelineError;
use crate::types::banknote::{FeatureRow, FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
use encoding_rs::{Encoding, WINDOWS_1252};
use std::borrow::Cow;
use tracing::debug;

/// Field delimiter of submitted batches
pub const DELIMITER: u8 = b';';

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Extracts canonical feature rows from tabular input.
pub struct FeatureExtractor {
    /// Encoding tried when the payload is not valid UTF-8
    fallback: &'static Encoding,
}

impl FeatureExtractor {
    /// Create an extractor with the windows-1252 fallback.
    pub fn new() -> Self {
        Self::with_fallback(WINDOWS_1252)
    }

    /// Create an extractor with a custom fallback encoding.
    pub fn with_fallback(fallback: &'static Encoding) -> Self {
        Self { fallback }
    }

    /// Fallback encoding name
    pub fn fallback_encoding(&self) -> &'static str {
        self.fallback.name()
    }

    /// Decode raw bytes as UTF-8, retrying once with the fallback encoding.
    ///
    /// WHATWG windows-1252 maps every byte, including 0x81, 0x8D, 0x8F, 0x90
    /// and 0x9D, so with the default fallback [`PipelineError::Decoding`] is
    /// only reachable through a stricter configured encoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, PipelineError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(Cow::Borrowed(text)),
            Err(e) => {
                debug!(
                    error = %e,
                    fallback = self.fallback.name(),
                    "Payload is not valid UTF-8, retrying with fallback encoding"
                );
                self.fallback
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .ok_or(PipelineError::Decoding {
                        fallback: self.fallback.name(),
                    })
            }
        }
    }

    /// Parse a `;`-delimited table with a header row into feature rows.
    ///
    /// Fails with [`PipelineError::Schema`] listing every missing required
    /// column before any row is converted.
    pub fn extract(&self, text: &str) -> Result<Vec<FeatureRow>, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .flexible(false)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let positions = Self::column_positions(&headers)?;

        let mut rows = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let mut values: FeatureVector = [0.0; FEATURE_COUNT];

            for (slot, (&position, column)) in positions.iter().zip(FEATURE_COLUMNS).enumerate() {
                let raw = record.get(position).unwrap_or_default();
                values[slot] = parse_feature(raw).ok_or_else(|| PipelineError::TypeConversion {
                    row,
                    column: column.to_string(),
                    value: raw.to_string(),
                })?;
            }

            rows.push(FeatureRow::from_array(values));
        }

        debug!(
            rows = rows.len(),
            columns = headers.len(),
            "Extracted feature rows"
        );

        Ok(rows)
    }

    /// Decode and extract in one step.
    pub fn extract_payload(&self, bytes: &[u8]) -> Result<Vec<FeatureRow>, PipelineError> {
        let text = self.decode(bytes)?;
        self.extract(&text)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in canonical order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURE_COLUMNS.to_vec()
    }

    /// Index of each required column in the header, in canonical order
    fn column_positions(headers: &[String]) -> Result<[usize; FEATURE_COUNT], PipelineError> {
        let mut positions = [0usize; FEATURE_COUNT];
        let mut missing = Vec::new();

        for (slot, column) in FEATURE_COLUMNS.iter().enumerate() {
            match headers.iter().position(|h| h == column) {
                Some(position) => positions[slot] = position,
                None => missing.push(column.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(positions)
        } else {
            Err(PipelineError::Schema { missing })
        }
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Finite decimal number with `.` as separator
fn parse_feature(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = "\
is_genuine;diagonal;height_left;height_right;margin_low;margin_up;length
True;171.81;104.86;104.95;4.52;2.89;112.83
False;171.46;103.36;103.66;3.77;2.99;113.09
";

    #[test]
    fn test_extract_ignores_extra_columns() {
        let extractor = FeatureExtractor::new();
        let rows = extractor.extract(BATCH).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].to_array(), [171.81, 104.86, 104.95, 4.52, 2.89, 112.83]);
        assert_eq!(rows[1].length, 113.09);
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let extractor = FeatureExtractor::new();
        let text = "length;margin_up;margin_low;height_right;height_left;diagonal\n6;5;4;3;2;1\n";

        let rows = extractor.extract(text).unwrap();
        assert_eq!(rows[0].to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_missing_column_is_named() {
        let extractor = FeatureExtractor::new();
        let text = "diagonal;height_left;height_right;margin_low;length\n1;2;3;4;6\n";

        match extractor.extract(text) {
            Err(PipelineError::Schema { missing }) => assert_eq!(missing, vec!["margin_up"]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_all_missing_columns_listed_in_order() {
        let extractor = FeatureExtractor::new();

        match extractor.extract("length,diagonal\n1,2\n") {
            Err(PipelineError::Schema { missing }) => assert_eq!(missing.len(), 6),
            other => panic!("expected schema error, got {:?}", other),
        }

        match extractor.extract("") {
            Err(PipelineError::Schema { missing }) => assert_eq!(missing, FEATURE_COLUMNS.to_vec()),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty_batch() {
        let extractor = FeatureExtractor::new();
        let rows = extractor.extract(&FEATURE_COLUMNS.join(";")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_non_numeric_value() {
        let extractor = FeatureExtractor::new();
        let text = "diagonal;height_left;height_right;margin_low;margin_up;length\n\
                    1;2;3;4;5;6\n\
                    1;2;3;;5;6\n";

        match extractor.extract(text) {
            Err(PipelineError::TypeConversion { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "margin_low");
                assert_eq!(value, "");
            }
            other => panic!("expected type conversion error, got {:?}", other),
        }

        let comma_decimal = "diagonal;height_left;height_right;margin_low;margin_up;length\n\
                             171,81;2;3;4;5;6\n";
        assert!(matches!(
            extractor.extract(comma_decimal),
            Err(PipelineError::TypeConversion { row: 0, .. })
        ));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let extractor = FeatureExtractor::new();
        let text = "diagonal;height_left;height_right;margin_low;margin_up;length\n1;2;3\n";

        let err = extractor.extract(text).unwrap_err();
        assert!(matches!(err, PipelineError::Malformed(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let extractor = FeatureExtractor::new();
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(BATCH.as_bytes());

        let text = extractor.decode(&bytes).unwrap();
        assert!(text.starts_with("is_genuine"));
        assert_eq!(extractor.extract(&text).unwrap().len(), 2);
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        let extractor = FeatureExtractor::new();
        // "numéro" encoded as windows-1252 is not valid UTF-8
        let mut bytes = b"num\xE9ro;".to_vec();
        bytes.extend_from_slice(FEATURE_COLUMNS.join(";").as_bytes());
        bytes.extend_from_slice(b"\n7;1;2;3;4;5;6\n");

        let text = extractor.decode(&bytes).unwrap();
        assert!(text.starts_with("numéro"));

        let rows = extractor.extract_payload(&bytes).unwrap();
        assert_eq!(rows[0].to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_windows_1252_accepts_undefined_bytes() {
        let extractor = FeatureExtractor::new();

        let text = extractor.decode(b"a\x81b\x8Dc\x8Fd\x90e\x9D").unwrap();
        assert_eq!(text, "a\u{81}b\u{8D}c\u{8F}d\u{90}e\u{9D}");
    }

    #[test]
    fn test_decode_fails_when_fallback_fails() {
        let extractor = FeatureExtractor::with_fallback(encoding_rs::UTF_8);

        let err = extractor.decode(b"diagonal\xFF").unwrap_err();
        assert!(matches!(err, PipelineError::Decoding { fallback: "UTF-8" }));
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 6);
        assert_eq!(extractor.feature_names().len(), 6);
        assert_eq!(extractor.fallback_encoding(), "windows-1252");
    }
}
