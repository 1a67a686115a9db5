//! Result Normalizer
//!
//! Rewrites raw engine geometry into the canonical convention (top-left
//! origin, normalized units unless pixels are configured) and puts the
//! observations into reading order. Normalization never fails: every
//! observation the engine reported comes out the other side.

pub mod reading_order;

pub use crate::geometry::{convert, BoundingBox, CoordinateUnits, GeometryConvention, ImageFrame, VerticalOrigin};
pub use reading_order::{group_lines, sort_reading_order, DEFAULT_SAME_LINE_OVERLAP};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LayoutSettings;
use crate::vision::{RecognitionOutput, TextObservation};

/// An observation expressed in the canonical convention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedObservation {
    /// Recognized text, untouched
    pub text: String,
    /// Bounding box in the canonical convention
    pub bounding_box: BoundingBox,
    /// Engine confidence clamped to [0, 1]
    pub confidence: f32,
}

/// Geometry normalizer and reading-order sorter
#[derive(Debug, Clone)]
pub struct Normalizer {
    target: GeometryConvention,
    origin_override: Option<VerticalOrigin>,
    same_line_overlap: f64,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&LayoutSettings::default())
    }
}

impl Normalizer {
    /// Create a normalizer from layout settings
    pub fn new(settings: &LayoutSettings) -> Self {
        let same_line_overlap = if settings.same_line_overlap.is_nan() {
            DEFAULT_SAME_LINE_OVERLAP
        } else {
            settings.same_line_overlap.clamp(0.0, 1.0)
        };

        Self {
            target: GeometryConvention::new(VerticalOrigin::TopLeft, settings.units),
            origin_override: settings.origin_override,
            same_line_overlap,
        }
    }

    /// Convention all output of this normalizer is expressed in
    pub fn target(&self) -> GeometryConvention {
        self.target
    }

    /// Normalize and order one recognition's observations
    pub fn normalize(&self, output: &RecognitionOutput) -> Vec<NormalizedObservation> {
        let source = self.source_convention(output.convention);

        let normalized: Vec<NormalizedObservation> = output
            .observations
            .iter()
            .map(|obs| self.normalize_observation(obs, output.frame, source))
            .collect();

        let ordered = sort_reading_order(normalized, |obs| obs.bounding_box, self.same_line_overlap);

        debug!(
            "Normalized {} observations from {:?} to {:?}",
            ordered.len(),
            source,
            self.target
        );

        ordered
    }

    /// Convert a single observation without reordering
    pub fn normalize_observation(
        &self,
        observation: &TextObservation,
        frame: ImageFrame,
        source: GeometryConvention,
    ) -> NormalizedObservation {
        let (max_x, max_y) = self.target.frame_extent(frame);
        let bounding_box =
            convert(&observation.bounding_box, frame, source, self.target).clipped_to(max_x, max_y);

        NormalizedObservation {
            text: observation.raw_text.clone(),
            bounding_box,
            confidence: clamp_confidence(observation.confidence),
        }
    }

    fn source_convention(&self, declared: GeometryConvention) -> GeometryConvention {
        match self.origin_override {
            Some(origin) => GeometryConvention::new(origin, declared.units),
            None => declared,
        }
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
