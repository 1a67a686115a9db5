//! Serializer
//!
//! Renders ordered observations in the two shapes callers consume: plain
//! newline-joined text, and a JSON array of positioned records.
//!
//! Record layout, identical for every element:
//!
//! ```text
//! { "text": string, "x": number, "y": number, "width": number, "height": number, "confidence": number }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{OcrError, OcrResult};
use crate::layout::NormalizedObservation;

/// Separator between fragments in text-only output
pub const TEXT_SEPARATOR: &str = "\n";

/// One element of the with-position JSON array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f32,
}

/// Borrowed form used when rendering, same field order as [`PositionRecord`]
#[derive(Serialize)]
struct PositionRecordRef<'a> {
    text: &'a str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    confidence: f32,
}

impl<'a> From<&'a NormalizedObservation> for PositionRecordRef<'a> {
    fn from(obs: &'a NormalizedObservation) -> Self {
        Self {
            text: &obs.text,
            x: obs.bounding_box.x,
            y: obs.bounding_box.y,
            width: obs.bounding_box.width,
            height: obs.bounding_box.height,
            confidence: obs.confidence,
        }
    }
}

/// Ordered observations plus their concatenated text, for one request
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    observations: Vec<NormalizedObservation>,
    full_text: String,
}

impl RecognitionResult {
    /// Wrap observations that are already in reading order
    pub fn from_ordered(observations: Vec<NormalizedObservation>) -> Self {
        let full_text = render_text_only(&observations);
        Self {
            observations,
            full_text,
        }
    }

    pub fn observations(&self) -> &[NormalizedObservation] {
        &self.observations
    }

    /// Text of all observations in reading order, newline separated
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// With-position JSON for this result
    pub fn to_json(&self, pretty: bool) -> OcrResult<String> {
        if pretty {
            render_with_position_pretty(&self.observations)
        } else {
            render_with_position(&self.observations)
        }
    }
}

/// Join observation texts in order; empty input gives an empty string
pub fn render_text_only(ordered: &[NormalizedObservation]) -> String {
    ordered
        .iter()
        .map(|obs| obs.text.as_str())
        .collect::<Vec<_>>()
        .join(TEXT_SEPARATOR)
}

/// Compact JSON array of positioned records; empty input gives `[]`
pub fn render_with_position(ordered: &[NormalizedObservation]) -> OcrResult<String> {
    let records: Vec<PositionRecordRef<'_>> = ordered.iter().map(Into::into).collect();
    Ok(serde_json::to_string(&records)?)
}

/// Indented variant of [`render_with_position`]
pub fn render_with_position_pretty(ordered: &[NormalizedObservation]) -> OcrResult<String> {
    let records: Vec<PositionRecordRef<'_>> = ordered.iter().map(Into::into).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Parse with-position JSON back into records
pub fn parse_with_position(json: &str) -> OcrResult<Vec<PositionRecord>> {
    serde_json::from_str(json).map_err(|e| OcrError::Encoding(format!("invalid position JSON: {}", e)))
}
