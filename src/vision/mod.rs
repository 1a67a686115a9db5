//! Recognition Adapter Layer
//!
//! Loads the image, hands it to an OCR engine (the "oracle") and returns
//! whatever the engine saw, unordered and unfiltered. Supported oracles:
//! - Windows OCR API (native backend on Windows)
//! - Recorded observations replayed from a JSON sidecar file

pub mod recorded;
#[cfg(windows)]
pub mod windows_ocr;

pub use recorded::RecordedOracle;
#[cfg(windows)]
pub use windows_ocr::WindowsOcr;

use image::DynamicImage;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::EngineSettings;
use crate::error::{OcrError, OcrResult};
use crate::geometry::{BoundingBox, GeometryConvention, ImageFrame};

/// OCR backend selection
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OracleBackend {
    /// The platform's built-in OCR engine
    #[default]
    Native,
    /// Observations recorded next to the image as `<image>.ocr.json`
    Recorded,
}

/// OCR result granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrGranularity {
    /// Full lines with their bounding boxes
    #[default]
    Line,
    /// Individual words with their bounding boxes
    Word,
}

/// One detected text fragment in the engine's own coordinate convention
#[derive(Debug, Clone, PartialEq)]
pub struct TextObservation {
    /// Text exactly as the engine reported it
    pub raw_text: String,
    /// Bounding box in the engine's convention
    pub bounding_box: BoundingBox,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl TextObservation {
    pub fn new(raw_text: impl Into<String>, bounding_box: BoundingBox, confidence: f32) -> Self {
        Self {
            raw_text: raw_text.into(),
            bounding_box,
            confidence,
        }
    }

    /// Build an observation from UTF-16 engine text, rejecting unpaired surrogates
    pub fn from_utf16(text: &[u16], bounding_box: BoundingBox, confidence: f32) -> OcrResult<Self> {
        let raw_text = String::from_utf16(text)
            .map_err(|e| OcrError::Encoding(format!("engine returned invalid UTF-16 text: {}", e)))?;
        Ok(Self::new(raw_text, bounding_box, confidence))
    }
}

/// What an oracle produced for one image
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOutput {
    /// Convention the boxes are expressed in
    pub convention: GeometryConvention,
    /// Observations in engine order
    pub observations: Vec<TextObservation>,
}

/// A single recognition request handed to an oracle
pub struct OracleRequest<'a> {
    /// Path the image was loaded from
    pub path: &'a Path,
    /// Decoded image
    pub image: &'a DynamicImage,
}

/// An external OCR engine
pub trait TextOracle: Send + Sync {
    /// Human readable engine name, used in logs
    fn name(&self) -> &str;

    /// Whether `observe` may run on several threads at once.
    ///
    /// Engines that return `false` are called behind a mutex.
    fn is_concurrent_safe(&self) -> bool {
        false
    }

    /// Recognize text in one image
    fn observe(&self, request: &OracleRequest<'_>) -> OcrResult<OracleOutput>;
}

/// Raw recognition output for one image
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOutput {
    /// Pixel size of the decoded image
    pub frame: ImageFrame,
    /// Convention of the observation boxes
    pub convention: GeometryConvention,
    /// Observations, unordered
    pub observations: Vec<TextObservation>,
}

/// Adapter around an oracle: image loading, error mapping and call gating
pub struct Recognizer {
    oracle: Box<dyn TextOracle>,
    gate: Option<Mutex<()>>,
}

impl Recognizer {
    /// Wrap an oracle, gating it if it cannot take concurrent calls
    pub fn new(oracle: Box<dyn TextOracle>) -> Self {
        let gate = if oracle.is_concurrent_safe() {
            None
        } else {
            Some(Mutex::new(()))
        };
        Self { oracle, gate }
    }

    /// Build the oracle selected in the engine settings
    pub fn from_settings(settings: &EngineSettings) -> OcrResult<Self> {
        Ok(Self::new(create_oracle(settings)?))
    }

    /// Name of the wrapped oracle
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Run the oracle once on the image at `image_path`
    pub fn recognize(&self, image_path: &Path) -> OcrResult<RecognitionOutput> {
        let image = load_image(image_path)?;
        let frame = ImageFrame::new(image.width(), image.height());

        let request = OracleRequest {
            path: image_path,
            image: &image,
        };

        let start = Instant::now();
        let output = {
            let _guard = self.gate.as_ref().map(|gate| gate.lock());
            self.oracle.observe(&request)?
        };

        debug!(
            "{}: {} observations in {}x{} image ({:?})",
            self.oracle.name(),
            output.observations.len(),
            frame.width,
            frame.height,
            start.elapsed()
        );

        Ok(RecognitionOutput {
            frame,
            convention: output.convention,
            observations: output.observations,
        })
    }
}

/// Load and decode an image, separating missing files from undecodable ones
pub fn load_image(path: &Path) -> OcrResult<DynamicImage> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(OcrError::ImageNotFound(path.to_path_buf()));
    }

    image::open(path).map_err(|err| match err {
        image::ImageError::IoError(io)
            if matches!(io.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) =>
        {
            OcrError::ImageNotFound(path.to_path_buf())
        }
        other => OcrError::ImageUndecodable {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })
}

/// Create the oracle selected in the engine settings
pub fn create_oracle(settings: &EngineSettings) -> OcrResult<Box<dyn TextOracle>> {
    info!("Initializing {:?} OCR backend", settings.backend);
    match settings.backend {
        OracleBackend::Native => native_oracle(settings),
        OracleBackend::Recorded => Ok(Box::new(RecordedOracle::new())),
    }
}

#[cfg(windows)]
fn native_oracle(settings: &EngineSettings) -> OcrResult<Box<dyn TextOracle>> {
    let engine = WindowsOcr::new(&settings.language, settings.granularity)
        .map_err(|e| OcrError::EngineUnavailable(format!("{:#}", e)))?;
    Ok(Box::new(engine))
}

#[cfg(not(windows))]
fn native_oracle(_settings: &EngineSettings) -> OcrResult<Box<dyn TextOracle>> {
    Err(OcrError::EngineUnavailable(
        "no native OCR engine on this platform; use the recorded backend".to_string(),
    ))
}

/// Recognizer languages installed for the native engine
#[cfg(windows)]
pub fn available_languages() -> OcrResult<Vec<String>> {
    WindowsOcr::available_languages().map_err(|e| OcrError::EngineUnavailable(format!("{:#}", e)))
}

/// Recognizer languages installed for the native engine
#[cfg(not(windows))]
pub fn available_languages() -> OcrResult<Vec<String>> {
    Err(OcrError::EngineUnavailable(
        "no native OCR engine on this platform".to_string(),
    ))
}
