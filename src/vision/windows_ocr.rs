//! Windows OCR API backend
//!
//! Uses the built-in Windows OCR (Media.Ocr) engine. Word rectangles come
//! back in pixels with a top-left origin. The engine exposes no confidence,
//! so every observation reports 1.0.

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use tracing::{debug, info, warn};
use windows::{
    core::HSTRING,
    Foundation::Rect,
    Globalization::Language,
    Graphics::Imaging::{BitmapPixelFormat, SoftwareBitmap},
    Media::Ocr::{OcrEngine as WinOcrEngine, OcrLine, OcrResult as WinOcrResult},
    Storage::Streams::DataWriter,
};

use super::{OcrGranularity, OracleOutput, OracleRequest, TextObservation, TextOracle};
use crate::error::{OcrError, OcrResult};
use crate::geometry::{BoundingBox, GeometryConvention};

/// Confidence reported for every observation
const ENGINE_CONFIDENCE: f32 = 1.0;

/// Windows OCR engine wrapper
pub struct WindowsOcr {
    engine: WinOcrEngine,
    /// Oracle name including the resolved recognizer language
    name: String,
    granularity: OcrGranularity,
}

impl WindowsOcr {
    /// Create an engine for the requested language, or the user profile
    /// languages when it is empty or not installed
    pub fn new(language_tag: &str, granularity: OcrGranularity) -> Result<Self> {
        let (engine, resolved) = open_engine(language_tag)?;
        info!(
            "Windows OCR ready: language={}, granularity={:?}",
            resolved, granularity
        );

        Ok(Self {
            engine,
            name: format!("windows-ocr ({})", resolved),
            granularity,
        })
    }

    /// BCP-47 tags of the recognizer languages installed on this system
    pub fn available_languages() -> Result<Vec<String>> {
        let languages = WinOcrEngine::AvailableRecognizerLanguages()
            .context("Failed to get available languages")?;

        Ok(languages
            .into_iter()
            .filter_map(|language| language_tag(&language).ok())
            .collect())
    }

    /// Recognize text in a decoded image
    pub fn recognize(&self, image: &DynamicImage) -> OcrResult<Vec<TextObservation>> {
        if image.width() == 0 || image.height() == 0 {
            return Ok(vec![]);
        }

        debug!("Windows OCR: Processing {}x{} image", image.width(), image.height());

        let ocr_result = self.run(image).map_err(|e| OcrError::Internal(format!("{:#}", e)))?;
        let observations = self.extract_observations(&ocr_result)?;

        debug!("Windows OCR: Found {} text regions", observations.len());
        Ok(observations)
    }

    fn run(&self, image: &DynamicImage) -> Result<WinOcrResult> {
        let max = WinOcrEngine::MaxImageDimension().context("Failed to query max image dimension")?;
        if image.width() > max || image.height() > max {
            bail!(
                "image is {}x{}, Windows OCR accepts at most {} pixels per side",
                image.width(),
                image.height(),
                max
            );
        }

        let bitmap = create_software_bitmap(image)?;

        // Block until the operation completes
        self.engine
            .RecognizeAsync(&bitmap)
            .context("Failed to start OCR recognition")?
            .get()
            .context("OCR recognition failed")
    }

    fn extract_observations(&self, ocr_result: &WinOcrResult) -> OcrResult<Vec<TextObservation>> {
        let lines = ocr_result.Lines().map_err(engine_error)?;

        let mut observations = Vec::new();
        for i in 0..lines.Size().map_err(engine_error)? {
            let line = lines.GetAt(i).map_err(engine_error)?;
            match self.granularity {
                OcrGranularity::Line => {
                    if let Some(observation) = line_observation(&line)? {
                        observations.push(observation);
                    }
                }
                OcrGranularity::Word => observations.extend(word_observations(&line)?),
            }
        }

        Ok(observations)
    }
}

impl TextOracle for WindowsOcr {
    fn name(&self) -> &str {
        &self.name
    }

    fn observe(&self, request: &OracleRequest<'_>) -> OcrResult<OracleOutput> {
        Ok(OracleOutput {
            convention: GeometryConvention::TOP_LEFT_PIXELS,
            observations: self.recognize(request.image)?,
        })
    }
}

/// Open an engine and report the language tag it actually recognizes
fn open_engine(requested: &str) -> Result<(WinOcrEngine, String)> {
    if !requested.is_empty() {
        let language = Language::CreateLanguage(&HSTRING::from(requested))
            .with_context(|| format!("Invalid language tag '{}'", requested))?;

        if WinOcrEngine::IsLanguageSupported(&language).context("Failed to check language support")? {
            let engine = WinOcrEngine::TryCreateFromLanguage(&language)
                .context("Failed to create OCR engine for language")?;
            return Ok((engine, requested.to_string()));
        }

        warn!("Language '{}' not installed, falling back to user profile languages", requested);
    }

    let engine = WinOcrEngine::TryCreateFromUserProfileLanguages()
        .context("No OCR language from the user profile is installed")?;
    let resolved = language_tag(&engine.RecognizerLanguage().context("Failed to get recognizer language")?)?;
    Ok((engine, resolved))
}

fn language_tag(language: &Language) -> Result<String> {
    Ok(language.LanguageTag().context("Failed to get language tag")?.to_string())
}

fn engine_error(err: windows::core::Error) -> OcrError {
    OcrError::Internal(format!("Windows OCR: {}", err))
}

fn rect_to_box(rect: Rect) -> BoundingBox {
    BoundingBox::new(rect.X as f64, rect.Y as f64, rect.Width as f64, rect.Height as f64)
}

fn word_observations(line: &OcrLine) -> OcrResult<Vec<TextObservation>> {
    let words = line.Words().map_err(engine_error)?;

    let mut observations = Vec::new();
    for j in 0..words.Size().map_err(engine_error)? {
        let word = words.GetAt(j).map_err(engine_error)?;
        let text = word.Text().map_err(engine_error)?;
        let rect = word.BoundingRect().map_err(engine_error)?;
        observations.push(TextObservation::from_utf16(
            text.as_wide(),
            rect_to_box(rect),
            ENGINE_CONFIDENCE,
        )?);
    }

    Ok(observations)
}

/// A line has no rectangle of its own, so use the union of its words
fn line_observation(line: &OcrLine) -> OcrResult<Option<TextObservation>> {
    let words = word_observations(line)?;
    let Some(bounds) = words
        .iter()
        .map(|w| w.bounding_box)
        .reduce(|acc, b| acc.union(&b))
    else {
        return Ok(None);
    };

    let text = line.Text().map_err(engine_error)?;
    TextObservation::from_utf16(text.as_wide(), bounds, ENGINE_CONFIDENCE).map(Some)
}

/// Create a BGRA SoftwareBitmap from a decoded image
fn create_software_bitmap(image: &DynamicImage) -> Result<SoftwareBitmap> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    // Windows expects BGRA
    let mut bgra = rgba.into_raw();
    for chunk in bgra.chunks_exact_mut(4) {
        chunk.swap(0, 2);
    }

    let writer = DataWriter::new().context("Failed to create data writer")?;
    writer.WriteBytes(&bgra).context("Failed to write pixel data")?;
    let buffer = writer.DetachBuffer().context("Failed to detach buffer")?;

    SoftwareBitmap::CreateCopyFromBuffer(&buffer, BitmapPixelFormat::Bgra8, width as i32, height as i32)
        .context("Failed to create SoftwareBitmap")
}
