//! OcrBridge - native OCR results behind a C-compatible boundary
//!
//! Turns a platform OCR engine's raw observations (text, engine-native box,
//! confidence) into a stable representation: newline-joined text, or a JSON
//! array of positioned records with a top-left origin.
//!
//! Data flows strictly one way:
//!
//! ```text
//! vision (Recognizer) -> layout (Normalizer) -> output (Serializer)
//! ```
//!
//! [`geometry`] holds the box and convention types every stage shares.
//!
//! [`pipeline::OcrPipeline`] composes the three; [`ffi`] exposes it to C.

pub mod config;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod vision;

pub use config::BridgeConfig;
pub use error::{ErrorCode, OcrError, OcrResult};
pub use geometry::{BoundingBox, GeometryConvention};
pub use layout::{NormalizedObservation, Normalizer};
pub use output::{render_text_only, render_with_position, RecognitionResult};
pub use pipeline::OcrPipeline;
pub use vision::{Recognizer, TextObservation, TextOracle};
