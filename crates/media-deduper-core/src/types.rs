use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::processing::PHash;

/// Recognized video suffixes (lowercase, without the dot)
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "asf", "avi", "flv", "hevc", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "rm", "rmvb", "ts",
    "vob", "webm", "wmv",
];

/// Recognized image suffixes (lowercase, without the dot)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp"];

/// Kind of media a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// Determine kind from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// A candidate file found during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path to the file
    pub path: PathBuf,

    /// File size in bytes
    pub size: u64,

    pub kind: MediaKind,
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count, used as the primary ordering key
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A perceptual hash together with the offset it was sampled at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: PHash,

    /// Position in the planned offset list; fingerprints of two files are
    /// compared only when their sample indices match
    pub sample: u32,

    /// Offset in milliseconds; `None` for still images
    pub offset_ms: Option<u64>,
}

impl Fingerprint {
    pub fn new(hash: PHash, sample: u32, offset: Option<f64>) -> Self {
        Self {
            hash,
            sample,
            offset_ms: offset.map(|secs| (secs * 1000.0).round() as u64),
        }
    }
}

/// A probed, sampled and hashed media file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Absolute path, unique within a run
    pub path: PathBuf,

    pub kind: MediaKind,

    /// Duration in seconds; `None` for images
    pub duration: Option<f64>,

    pub resolution: Resolution,

    /// Average frame rate, when the container reports one
    pub fps: Option<f64>,

    /// Video codec name, when known
    pub codec: Option<String>,

    /// File size in bytes
    pub size: u64,

    /// One fingerprint per successfully sampled offset, in offset order
    pub fingerprints: Vec<Fingerprint>,
}

/// Why a discovered file did not make it into grouping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Metadata could not be read
    Probe(String),

    /// Not a single frame could be extracted
    NoFrames(String),

    /// A frame could not be hashed
    Hash(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Probe(detail) => write!(f, "probe failed: {}", detail),
            SkipReason::NoFrames(detail) => write!(f, "no frames extracted: {}", detail),
            SkipReason::Hash(detail) => write!(f, "hashing failed: {}", detail),
        }
    }
}

/// A file excluded from the run, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Indices of items believed to be visual duplicates of one another
///
/// Members index into the item arena of the [`crate::ScanReport`] that owns
/// the group. A group always has at least two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub(crate) members: Vec<usize>,
}

impl DuplicateGroup {
    pub(crate) fn new(members: Vec<usize>) -> Self {
        debug_assert!(members.len() >= 2);
        Self { members }
    }

    /// Member indices in presentation order
    pub fn indices(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
