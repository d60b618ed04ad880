//! Metadata probing: `ffprobe` for videos, the image header for stills.

use log::debug;
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::tools::{ToolError, ToolRunner};
use crate::error::{Error, Result};
use crate::types::{MediaFile, MediaKind, Resolution};

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

/// Metadata of one file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Seconds; `None` for images
    pub duration: Option<f64>,
    pub resolution: Resolution,
    pub fps: Option<f64>,
    pub codec: Option<String>,
}

/// Reads duration, resolution, codec and frame rate of media files
#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe: Option<PathBuf>,
    runner: ToolRunner,
}

impl MediaProbe {
    /// `ffprobe` may be `None` for image-only runs
    pub fn new(ffprobe: Option<PathBuf>, runner: ToolRunner) -> Self {
        Self { ffprobe, runner }
    }

    /// Probe one file
    ///
    /// Returns [`Error::Probe`] for unreadable files. [`Error::BinaryMissing`]
    /// and [`Error::Interrupted`] concern the whole run.
    pub fn probe(&self, file: &MediaFile) -> Result<MediaInfo> {
        match file.kind {
            MediaKind::Image => probe_image(&file.path),
            MediaKind::Video => self.probe_video(&file.path),
        }
    }

    fn probe_video(&self, path: &Path) -> Result<MediaInfo> {
        let ffprobe = self.ffprobe.as_ref().ok_or_else(|| Error::BinaryMissing {
            tool: super::tools::FFPROBE.to_string(),
            searched: "not resolved for this run".to_string(),
        })?;

        debug!("ffprobe: path={}", path.display());

        let mut args: Vec<&OsStr> = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-show_entries",
            "stream=width,height,avg_frame_rate,codec_name",
            "-select_streams",
            "v:0",
            "-of",
            "json",
        ]
        .into_iter()
        .map(OsStr::new)
        .collect();
        args.push(path.as_os_str());

        let output = self
            .runner
            .run(ffprobe, args)
            .map_err(|e| probe_tool_error(path, e))?;

        let json = String::from_utf8(output.stdout).map_err(|_| Error::Probe {
            path: path.to_path_buf(),
            reason: "ffprobe output was not valid UTF-8".to_string(),
        })?;

        parse_ffprobe_json(&json).map_err(|reason| Error::Probe {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Dimensions straight from the image header; no subprocess
pub fn probe_image(path: &Path) -> Result<MediaInfo> {
    let (width, height) = image::image_dimensions(path).map_err(|e| Error::Probe {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if width == 0 || height == 0 {
        return Err(Error::Probe {
            path: path.to_path_buf(),
            reason: format!("image reports zero dimension ({}x{})", width, height),
        });
    }

    Ok(MediaInfo {
        duration: None,
        resolution: Resolution::new(width, height),
        fps: None,
        codec: None,
    })
}

/// Parse `ffprobe -of json` output for the first video stream
pub fn parse_ffprobe_json(json: &str) -> std::result::Result<MediaInfo, String> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("failed to parse ffprobe JSON: {}", e))?;

    let stream = output
        .streams
        .first()
        .ok_or_else(|| "no video stream".to_string())?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(format!(
            "video stream reports zero dimension ({}x{})",
            width, height
        ));
    }

    let duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    Ok(MediaInfo {
        duration,
        resolution: Resolution::new(width, height),
        fps: stream.avg_frame_rate.as_deref().and_then(parse_frame_rate),
        codec: stream.codec_name.clone(),
    })
}

/// Parse a `num/den` rate; a zero denominator means unknown
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

fn probe_tool_error(path: &Path, err: ToolError) -> Error {
    match err.into_fatal() {
        Ok(fatal) => fatal,
        Err(err) => Error::Probe {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    }
}
