//! Bounding box geometry and coordinate conventions
//!
//! OCR engines disagree on where the origin sits and what a unit is. Apple
//! Vision reports unit-normalized boxes with the origin at the bottom-left,
//! Windows OCR reports pixels from the top-left. Everything downstream of the
//! normalizer sees a single convention.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box (x, y, width, height)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Upper edge, assuming a top-left origin
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Lower edge, assuming a top-left origin
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Mirror the box vertically inside a frame of the given height.
    ///
    /// Applying the flip twice returns the original box.
    pub fn flip_vertical(&self, extent: f64) -> Self {
        Self {
            y: extent - self.y - self.height,
            ..*self
        }
    }

    /// Scale both axes independently
    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> Self {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(left, top, right - left, bottom - top)
    }

    /// Drop non-finite values and clip the box to the frame's top-left edges
    pub fn sanitized(&self) -> Self {
        let x = finite_or_zero(self.x);
        let y = finite_or_zero(self.y);
        let width = finite_or_zero(self.width).max(0.0);
        let height = finite_or_zero(self.height).max(0.0);

        // Clip rather than shift so the right/bottom edges stay put
        let clipped_x = x.max(0.0);
        let clipped_y = y.max(0.0);
        Self {
            x: clipped_x,
            y: clipped_y,
            width: (width - (clipped_x - x)).max(0.0),
            height: (height - (clipped_y - y)).max(0.0),
        }
    }

    /// Sanitize, then clip the right/bottom edges to the given extents
    pub fn clipped_to(&self, max_x: f64, max_y: f64) -> Self {
        let b = self.sanitized();
        let x = b.x.min(max_x);
        let y = b.y.min(max_y);
        Self {
            x,
            y,
            width: b.width.min(max_x - x),
            height: b.height.min(max_y - y),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Where the vertical origin of a coordinate system sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalOrigin {
    /// y grows downward from the top edge
    #[default]
    TopLeft,
    /// y grows upward from the bottom edge
    BottomLeft,
}

/// Unit system for box coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateUnits {
    /// Fractions of the image width/height, in [0, 1]
    #[default]
    Normalized,
    /// Absolute pixels
    Pixels,
}

/// Origin plus units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeometryConvention {
    pub origin: VerticalOrigin,
    pub units: CoordinateUnits,
}

impl GeometryConvention {
    /// Convention of all normalized output unless pixels are configured
    pub const CANONICAL: Self = Self {
        origin: VerticalOrigin::TopLeft,
        units: CoordinateUnits::Normalized,
    };

    /// Apple Vision style: unit square, origin bottom-left
    pub const BOTTOM_LEFT_NORMALIZED: Self = Self {
        origin: VerticalOrigin::BottomLeft,
        units: CoordinateUnits::Normalized,
    };

    /// Windows OCR style: pixels, origin top-left
    pub const TOP_LEFT_PIXELS: Self = Self {
        origin: VerticalOrigin::TopLeft,
        units: CoordinateUnits::Pixels,
    };

    pub fn new(origin: VerticalOrigin, units: CoordinateUnits) -> Self {
        Self { origin, units }
    }

    /// Width and height of the frame in this convention's units
    pub fn frame_extent(&self, frame: ImageFrame) -> (f64, f64) {
        match self.units {
            CoordinateUnits::Normalized => (1.0, 1.0),
            CoordinateUnits::Pixels => (frame.width as f64, frame.height as f64),
        }
    }
}

/// Pixel dimensions of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
}

impl ImageFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Re-express a box from one convention in another.
///
/// Units are converted first, then the origin is flipped using the target
/// units. A zero-sized frame maps pixel boxes to the origin.
pub fn convert(
    bbox: &BoundingBox,
    frame: ImageFrame,
    from: GeometryConvention,
    to: GeometryConvention,
) -> BoundingBox {
    let (w, h) = (frame.width as f64, frame.height as f64);

    let scaled = match (from.units, to.units) {
        (CoordinateUnits::Pixels, CoordinateUnits::Normalized) => {
            if frame.width == 0 || frame.height == 0 {
                BoundingBox::default()
            } else {
                bbox.scale(1.0 / w, 1.0 / h)
            }
        }
        (CoordinateUnits::Normalized, CoordinateUnits::Pixels) => bbox.scale(w, h),
        _ => *bbox,
    };

    if from.origin == to.origin {
        scaled
    } else {
        scaled.flip_vertical(to.frame_extent(frame).1)
    }
}
