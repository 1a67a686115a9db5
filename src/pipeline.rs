//! Recognition pipeline
//!
//! Adapter -> Normalizer -> Serializer, one synchronous chain per request.
//! The pipeline holds no per-request state and can be shared across threads.

use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::{BridgeConfig, OutputSettings};
use crate::error::OcrResult;
use crate::layout::Normalizer;
use crate::output::RecognitionResult;
use crate::vision::Recognizer;

/// Composed OCR pipeline
pub struct OcrPipeline {
    recognizer: Recognizer,
    normalizer: Normalizer,
    output: OutputSettings,
}

impl OcrPipeline {
    /// Assemble a pipeline from its parts
    pub fn new(recognizer: Recognizer, normalizer: Normalizer, output: OutputSettings) -> Self {
        Self {
            recognizer,
            normalizer,
            output,
        }
    }

    /// Build the pipeline described by a configuration
    pub fn from_config(config: &BridgeConfig) -> OcrResult<Self> {
        let recognizer = Recognizer::from_settings(&config.engine)?;
        let normalizer = Normalizer::new(&config.layout);

        info!(
            "OCR pipeline ready: engine={}, output={:?}",
            recognizer.oracle_name(),
            normalizer.target()
        );

        Ok(Self::new(recognizer, normalizer, config.output.clone()))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Recognize, normalize and order the text in an image
    pub fn recognize(&self, image_path: &Path) -> OcrResult<RecognitionResult> {
        let start = Instant::now();

        let raw = self.recognizer.recognize(image_path)?;
        let ordered = self.normalizer.normalize(&raw);
        let result = RecognitionResult::from_ordered(ordered);

        debug!(
            "Recognized {} fragments in {:?} ({:?})",
            result.len(),
            image_path,
            start.elapsed()
        );
        Ok(result)
    }

    /// Text-only mode: fragments joined by newlines
    pub fn recognize_text(&self, image_path: &Path) -> OcrResult<String> {
        let result = self.recognize(image_path)?;
        Ok(result.full_text().to_string())
    }

    /// With-position mode: JSON array of positioned records
    pub fn recognize_with_position(&self, image_path: &Path) -> OcrResult<String> {
        self.recognize(image_path)?.to_json(self.output.pretty_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::vision::RecordedOracle;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn recorded_pipeline() -> OcrPipeline {
        OcrPipeline::new(
            Recognizer::new(Box::new(RecordedOracle::new())),
            Normalizer::default(),
            OutputSettings::default(),
        )
    }

    fn image_with_recording(dir: &TempDir, name: &str, recording: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        image::RgbaImage::new(100, 50).save(&path).unwrap();
        std::fs::write(crate::vision::recorded::sidecar_path(&path), recording).unwrap();
        path
    }

    #[test]
    fn test_missing_image_surfaces_not_found() {
        let pipeline = recorded_pipeline();
        let path = Path::new("/nonexistent/scan.png");
        assert!(matches!(pipeline.recognize_text(path), Err(OcrError::ImageNotFound(_))));
        assert!(matches!(
            pipeline.recognize_with_position(path),
            Err(OcrError::ImageNotFound(_))
        ));
    }

    #[test]
    fn test_no_text_is_success() {
        let dir = TempDir::new().unwrap();
        let path = image_with_recording(
            &dir,
            "blank.png",
            r#"{"origin": "bottom_left", "units": "normalized", "observations": []}"#,
        );

        let pipeline = recorded_pipeline();
        assert_eq!(pipeline.recognize_text(&path).unwrap(), "");
        assert_eq!(pipeline.recognize_with_position(&path).unwrap(), "[]");
    }

    #[test]
    fn test_pixel_recording_is_normalized() {
        let dir = TempDir::new().unwrap();
        let path = image_with_recording(
            &dir,
            "win.png",
            r#"{"origin": "top_left", "units": "pixels", "observations": [
                {"text": "right", "x": 60, "y": 10, "width": 30, "height": 10},
                {"text": "left", "x": 10, "y": 11, "width": 30, "height": 10}
            ]}"#,
        );

        let result = recorded_pipeline().recognize(&path).unwrap();
        assert_eq!(result.full_text(), "left\nright");
        let first = &result.observations()[0].bounding_box;
        assert!((first.x - 0.1).abs() < 1e-9);
        assert!((first.y - 0.22).abs() < 1e-9);
        assert!((first.width - 0.3).abs() < 1e-9);
        assert!((first.height - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_pipeline_is_shareable_across_threads() {
        let dir = TempDir::new().unwrap();
        let path = image_with_recording(
            &dir,
            "shared.png",
            r#"{"origin": "bottom_left", "units": "normalized", "observations": [
                {"text": "World", "x": 0.1, "y": 0.6, "width": 0.2, "height": 0.1},
                {"text": "Hello", "x": 0.1, "y": 0.8, "width": 0.2, "height": 0.1}
            ]}"#,
        );

        let pipeline = Arc::new(recorded_pipeline());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pipeline = pipeline.clone();
                let path = path.clone();
                std::thread::spawn(move || pipeline.recognize_text(&path).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "Hello\nWorld");
        }
    }
}
