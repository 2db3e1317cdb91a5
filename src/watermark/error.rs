//! Watermark error types.
//!
//! Nothing in the render path surfaces these to the caller: each variant has
//! a documented degradation (fallback style, base image unchanged, minimum
//! size) applied by the engine. They exist so the helpers can use `?` and
//! so the degradations can be logged with a precise reason.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing or rendering a watermark.
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// A font or color could not be resolved. Recovered via fallback.
    #[error("Failed to resolve style: {0}")]
    StyleResolution(String),

    /// The image watermark file does not exist.
    #[error("Watermark asset not found: {}", .0.display())]
    MissingAsset(PathBuf),

    /// The watermark asset or a font file could not be decoded.
    #[error("Failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// Scale parameters were zero, negative or non-finite.
    #[error("Invalid scale parameters: {0}")]
    InvalidScale(String),

    /// The resampler rejected the requested dimensions.
    #[error("Resize failed: {0}")]
    Resize(String),
}

impl WatermarkError {
    pub fn decode(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.to_string(),
        }
    }
}
