//! Error handling module for resolution selection
//!
//! Lookups and parsers return these errors internally. The public node
//! facades never propagate them: they report to the observer and fall back
//! to a fixed default resolution.

use thiserror::Error;

/// Main error type for resolution selection
#[derive(Error, Debug)]
pub enum ResolutionError {
    /// Model family key not present in the table
    #[error("Unknown model family: '{0}'")]
    UnknownModelFamily(String),

    /// Aspect ratio not present for the given model family
    #[error("Aspect ratio '{aspect_ratio}' not available for '{model_family}'")]
    UnknownAspectRatio {
        model_family: String,
        aspect_ratio: String,
    },

    /// Model family exists but defines no aspect ratios at all
    #[error("No aspect ratios available for mode '{0}'")]
    NoAspectRatios(String),

    /// Quality tier missing for a valid (family, aspect ratio) pair
    #[error("Quality '{quality}' not defined for {model_family}-{aspect_ratio}")]
    MissingQuality {
        model_family: String,
        aspect_ratio: String,
        quality: String,
    },

    /// Malformed "WIDTHxHEIGHT" preset string
    #[error("Invalid resolution string '{input}': {reason}")]
    InvalidPreset { input: String, reason: String },

    /// Block size other than 64 or 128
    #[error("Unsupported block size: {0} (expected 64 or 128)")]
    InvalidBlockSize(u32),

    /// Radial mode other than upscale/downscale/closest
    #[error("Unknown radial mode: '{0}'")]
    InvalidRadialMode(String),

    /// Structural problems in a resolution table
    #[error("Invalid resolution table: {0}")]
    InvalidTable(String),

    /// IO errors (config and table files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, ResolutionError>;

impl ResolutionError {
    /// Create an unknown aspect ratio error
    pub fn unknown_aspect_ratio(
        model_family: impl Into<String>,
        aspect_ratio: impl Into<String>,
    ) -> Self {
        Self::UnknownAspectRatio {
            model_family: model_family.into(),
            aspect_ratio: aspect_ratio.into(),
        }
    }

    /// Create a missing quality error
    pub fn missing_quality(
        model_family: impl Into<String>,
        aspect_ratio: impl Into<String>,
        quality: impl Into<String>,
    ) -> Self {
        Self::MissingQuality {
            model_family: model_family.into(),
            aspect_ratio: aspect_ratio.into(),
            quality: quality.into(),
        }
    }

    /// Create an invalid preset string error
    pub fn invalid_preset(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPreset {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid table error
    pub fn invalid_table(msg: impl Into<String>) -> Self {
        Self::InvalidTable(msg.into())
    }
}
