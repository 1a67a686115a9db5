//! Recorded observations backend
//!
//! Replays engine output captured earlier and stored next to the image as
//! `<image>.ocr.json`. Lets the rest of the pipeline run on machines without a
//! native engine, and makes engine quirks reproducible.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{OracleOutput, OracleRequest, TextObservation, TextOracle};
use crate::error::{OcrError, OcrResult};
use crate::geometry::{BoundingBox, GeometryConvention};

/// Extension appended to the image path to find its recording
pub const SIDECAR_EXTENSION: &str = "ocr.json";

/// A recording of one engine run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Convention the recorded boxes use
    #[serde(flatten)]
    pub convention: GeometryConvention,
    /// Observations in the order the engine returned them
    #[serde(default)]
    pub observations: Vec<RecordedObservation>,
}

/// A single recorded observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedObservation {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

impl From<RecordedObservation> for TextObservation {
    fn from(rec: RecordedObservation) -> Self {
        TextObservation::new(
            rec.text,
            BoundingBox::new(rec.x, rec.y, rec.width, rec.height),
            rec.confidence,
        )
    }
}

/// Path of the recording belonging to an image
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let mut name = OsString::from(image_path.as_os_str());
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Load a recording from file
pub fn load_recording(path: &Path) -> OcrResult<Recording> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OcrError::EngineUnavailable(format!("no recording at {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| OcrError::Internal(format!("corrupt recording {}: {}", path.display(), e)))
}

/// Save a recording to file
pub fn save_recording(recording: &Recording, path: &Path) -> OcrResult<()> {
    let content = serde_json::to_string_pretty(recording)?;
    std::fs::write(path, content)
        .map_err(|e| OcrError::Internal(format!("failed to write {}: {}", path.display(), e)))
}

/// Oracle that replays `<image>.ocr.json` recordings
#[derive(Debug, Default)]
pub struct RecordedOracle;

impl RecordedOracle {
    pub fn new() -> Self {
        Self
    }
}

impl TextOracle for RecordedOracle {
    fn name(&self) -> &str {
        "recorded"
    }

    fn is_concurrent_safe(&self) -> bool {
        true
    }

    fn observe(&self, request: &OracleRequest<'_>) -> OcrResult<OracleOutput> {
        let path = sidecar_path(request.path);
        let recording = load_recording(&path)?;
        debug!("Replaying {} observations from {:?}", recording.observations.len(), path);

        Ok(OracleOutput {
            convention: recording.convention,
            observations: recording.observations.into_iter().map(Into::into).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CoordinateUnits, VerticalOrigin};
    use tempfile::TempDir;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/shots/page.png")),
            PathBuf::from("/shots/page.png.ocr.json")
        );
    }

    #[test]
    fn test_parse_recording() {
        let json = r#"{
            "origin": "bottom_left",
            "units": "normalized",
            "observations": [
                {"text": "Hello", "x": 0.1, "y": 0.8, "width": 0.2, "height": 0.1, "confidence": 0.98},
                {"text": "World", "x": 0.1, "y": 0.6, "width": 0.2, "height": 0.1}
            ]
        }"#;

        let recording: Recording = serde_json::from_str(json).unwrap();
        assert_eq!(recording.convention.origin, VerticalOrigin::BottomLeft);
        assert_eq!(recording.convention.units, CoordinateUnits::Normalized);
        assert_eq!(recording.observations.len(), 2);
        assert!((recording.observations[1].confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_and_observe() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("scan.png");
        let image = image::DynamicImage::new_rgba8(2, 2);
        image.save(&image_path).unwrap();

        let recording = Recording {
            convention: GeometryConvention::TOP_LEFT_PIXELS,
            observations: vec![RecordedObservation {
                text: "42".to_string(),
                x: 0.0,
                y: 1.0,
                width: 2.0,
                height: 1.0,
                confidence: 0.5,
            }],
        };
        save_recording(&recording, &sidecar_path(&image_path)).unwrap();

        let output = RecordedOracle::new()
            .observe(&OracleRequest {
                path: &image_path,
                image: &image,
            })
            .unwrap();
        assert_eq!(output.convention, GeometryConvention::TOP_LEFT_PIXELS);
        assert_eq!(output.observations[0].raw_text, "42");
    }

    #[test]
    fn test_missing_recording_is_engine_unavailable() {
        let dir = TempDir::new().unwrap();
        let image_path = dir.path().join("scan.png");
        let image = image::DynamicImage::new_rgba8(2, 2);

        let result = RecordedOracle::new().observe(&OracleRequest {
            path: &image_path,
            image: &image,
        });
        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }
}
