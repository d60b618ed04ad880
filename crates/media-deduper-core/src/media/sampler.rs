//! Frame sampling: evenly spaced screenshots of videos, the still itself for images.

use image::DynamicImage;
use log::debug;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::probe::MediaInfo;
use super::tools::{ToolRunner, FFMPEG};
use crate::error::{Error, Result};
use crate::logging::log_tool_failure;
use crate::types::{MediaFile, MediaKind};

/// One decoded frame and where it was taken
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Index of the planned offset this frame came from
    pub sample: u32,
    /// Seconds into the video; `None` for still images
    pub offset: Option<f64>,
    pub image: DynamicImage,
}

/// Frames that could be extracted plus the offsets that failed
#[derive(Debug, Default)]
pub struct SampleOutcome {
    pub frames: Vec<SampledFrame>,
    pub failures: Vec<Error>,
}

/// Compute `count` offsets inside `[margin·d, (1−margin)·d]`
///
/// A single sample lands on the midpoint; several samples include both ends of
/// the window. An unknown or zero duration yields the single offset `0.0`.
pub fn sample_offsets(duration: Option<f64>, count: usize, margin: f64) -> Vec<f64> {
    let duration = match duration {
        Some(d) if d > 0.0 => d,
        _ => return vec![0.0],
    };

    let start = duration * margin;
    let end = duration * (1.0 - margin);

    if count <= 1 {
        return vec![(start + end) / 2.0];
    }

    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Extracts frames with `ffmpeg` into a per-run scratch directory
#[derive(Debug, Clone)]
pub struct ScreenshotSampler {
    ffmpeg: Option<PathBuf>,
    runner: ToolRunner,
    frame_dir: PathBuf,
    sample_count: usize,
    margin_fraction: f64,
}

impl ScreenshotSampler {
    pub fn new(
        ffmpeg: Option<PathBuf>,
        runner: ToolRunner,
        frame_dir: PathBuf,
        sample_count: usize,
        margin_fraction: f64,
    ) -> Self {
        Self {
            ffmpeg,
            runner,
            frame_dir,
            sample_count,
            margin_fraction,
        }
    }

    /// Sample one file
    ///
    /// `index` keeps scratch file names unique across concurrent tasks. Per-offset
    /// failures are collected in the outcome; only run-fatal errors are returned.
    pub fn sample(&self, index: usize, file: &MediaFile, info: &MediaInfo) -> Result<SampleOutcome> {
        let mut outcome = SampleOutcome::default();

        match file.kind {
            MediaKind::Image => match load_frame(&file.path) {
                Ok(image) => outcome.frames.push(SampledFrame {
                    sample: 0,
                    offset: None,
                    image,
                }),
                Err(e) => outcome.failures.push(Error::Sample {
                    path: file.path.clone(),
                    offset: 0.0,
                    reason: e.to_string(),
                }),
            },
            MediaKind::Video => {
                let offsets =
                    sample_offsets(info.duration, self.sample_count, self.margin_fraction);

                for (i, offset) in offsets.into_iter().enumerate() {
                    match self.extract_frame(index, i, &file.path, offset) {
                        Ok(image) => outcome.frames.push(SampledFrame {
                            sample: i as u32,
                            offset: Some(offset),
                            image,
                        }),
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            log_tool_failure(FFMPEG, &file.path, &e);
                            outcome.failures.push(e);
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }

    fn extract_frame(
        &self,
        index: usize,
        sample: usize,
        path: &Path,
        offset: f64,
    ) -> Result<DynamicImage> {
        let ffmpeg = self.ffmpeg.as_ref().ok_or_else(|| Error::BinaryMissing {
            tool: FFMPEG.to_string(),
            searched: "not resolved for this run".to_string(),
        })?;

        let output = self.frame_dir.join(format!("{}_{}.jpg", index, sample));
        let sample_error = |reason: String| Error::Sample {
            path: path.to_path_buf(),
            offset,
            reason,
        };

        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-ss".into(),
            format!("{:.3}", offset).into(),
            "-i".into(),
            path.as_os_str().to_os_string(),
            "-vf".into(),
            "scale=iw*sar:ih".into(),
            "-frames:v".into(),
            "1".into(),
            "-q:v".into(),
            "3".into(),
            "-y".into(),
            output.as_os_str().to_os_string(),
        ];

        debug!("ffmpeg: path={} offset={:.3}", path.display(), offset);

        self.runner
            .run(ffmpeg, &args)
            .map_err(|e| match e.into_fatal() {
                Ok(fatal) => fatal,
                Err(e) => sample_error(e.to_string()),
            })?;

        let written = fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            let _ = fs::remove_file(&output);
            return Err(sample_error(
                "no frame written (offset past the end?)".to_string(),
            ));
        }

        let frame = load_frame(&output);
        let _ = fs::remove_file(&output);
        frame.map_err(|e| sample_error(e.to_string()))
    }
}

/// Decode an image, sniffing the format from its content
pub fn load_frame(path: &Path) -> image::ImageResult<DynamicImage> {
    image::io::Reader::open(path)?.with_guessed_format()?.decode()
}
