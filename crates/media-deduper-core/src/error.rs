use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the media-deduper library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A required external binary could not be located or started
    #[error("Required binary '{tool}' not found (searched: {searched})")]
    BinaryMissing { tool: String, searched: String },

    /// Metadata probing failed for one file
    #[error("Probe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    /// Frame extraction failed for one offset of one file
    #[error("Sampling {path} at {offset:.3}s failed: {reason}")]
    Sample {
        path: PathBuf,
        offset: f64,
        reason: String,
    },

    /// Perceptual hashing was handed a frame it cannot hash
    #[error("Hash computation failed for {path}: {reason}")]
    Hash { path: PathBuf, reason: String },

    /// The run was cancelled
    #[error("Operation interrupted")]
    Interrupted,

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Whether this error must abort the whole run rather than skip one file
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::BinaryMissing { .. } | Error::Interrupted)
    }
}
