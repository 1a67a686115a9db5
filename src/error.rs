//! Error taxonomy shared by every layer and the C boundary

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning an image into recognized text
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Image not found or unreadable: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("Image is not a supported format: {}: {reason}", .path.display())]
    ImageUndecodable { path: PathBuf, reason: String },

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Text encoding error: {0}")]
    Encoding(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for OCR operations
pub type OcrResult<T> = Result<T, OcrError>;

/// Numeric error codes reported across the C boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    None = 0,
    ImageNotFound = 1,
    ImageUndecodable = 2,
    EngineUnavailable = 3,
    Encoding = 4,
    Internal = 5,
}

impl OcrError {
    /// Stable numeric code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            OcrError::ImageNotFound(_) => ErrorCode::ImageNotFound,
            OcrError::ImageUndecodable { .. } => ErrorCode::ImageUndecodable,
            OcrError::EngineUnavailable(_) => ErrorCode::EngineUnavailable,
            OcrError::Encoding(_) => ErrorCode::Encoding,
            OcrError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Stable string code, used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            OcrError::ImageNotFound(_) => "IMAGE_NOT_FOUND",
            OcrError::ImageUndecodable { .. } => "IMAGE_UNDECODABLE",
            OcrError::EngineUnavailable(_) => "ENGINE_UNAVAILABLE",
            OcrError::Encoding(_) => "ENCODING_ERROR",
            OcrError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for OcrError {
    fn from(err: serde_json::Error) -> Self {
        OcrError::Encoding(err.to_string())
    }
}
