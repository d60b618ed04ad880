//! Core functionality for finding visually duplicated videos and images.
//!
//! This library provides the building blocks of a duplicate scan:
//! - File discovery
//! - Metadata probing and frame sampling through `ffprobe` / `ffmpeg`
//! - Perceptual hashing of sampled frames
//! - Transitive similarity grouping and result ordering

// -- External Dependencies --

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rayon::prelude::*;

// -- Standard Library --
use std::path::Path;
use std::time::Instant;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use cancel::CancelToken;
pub use config::*;
pub use error::{Error, Result};
pub use report::{PropertyDiff, ReportRecord, ScanReport};
pub use types::*;

// -- Public Modules --
pub mod cancel;
pub mod config;
pub mod deduplication;
pub mod discovery;
pub mod logging;
pub mod media;
pub mod processing;
pub mod report;
pub mod types;

use deduplication::{order_by_duration, order_groups, SimilarityGrouper};
use media::{MediaInfo, MediaProbe, ScreenshotSampler, ToolPaths, ToolRunner};
use processing::PerceptualHasher;

/// Result of processing one discovered file
enum FileOutcome {
    Done(MediaItem),
    Skipped(SkippedFile),
    Cancelled,
    Fatal(Error),
}

/// Per-run collaborators shared by every worker
struct Stages {
    probe: MediaProbe,
    sampler: ScreenshotSampler,
    hasher: PerceptualHasher,
}

/// Main entry point for a duplicate scan
pub struct MediaDeduper {
    config: Config,
    cancel: CancelToken,
}

impl MediaDeduper {
    /// Create a deduper; fails on an invalid configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that aborts a running [`MediaDeduper::run`] from another thread
    ///
    /// The token is not cleared between runs; call [`CancelToken::reset`] to
    /// run again after a cancellation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the full pipeline over `root`
    ///
    /// Unreadable files end up in [`ScanReport::skipped`]. A missing external
    /// binary yields [`Error::BinaryMissing`] and cancellation yields
    /// [`Error::Interrupted`]; no partial report is returned in either case.
    pub fn run(&self, root: &Path) -> Result<ScanReport> {
        let start_time = Instant::now();

        info!("Discovering media in {}", root.display());
        let files = discovery::discover_media(root, &self.config)?;
        let videos = files.iter().filter(|f| f.kind == MediaKind::Video).count();
        info!(
            "Found {} files ({} videos, {} images)",
            files.len(),
            videos,
            files.len() - videos
        );

        // Image-only runs never need the external tools
        let tools = if videos > 0 {
            Some(ToolPaths::resolve(self.config.tool_dir.as_deref())?)
        } else {
            None
        };

        if self.cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }

        let frame_dir = tempfile::Builder::new()
            .prefix("media-deduper-")
            .tempdir()?;
        debug!("Extracting frames into {}", frame_dir.path().display());

        let runner = self.runner();
        let (ffprobe, ffmpeg) = match tools {
            Some(tools) => (Some(tools.ffprobe), Some(tools.ffmpeg)),
            None => (None, None),
        };
        let stages = Stages {
            probe: MediaProbe::new(ffprobe, runner.clone()),
            sampler: ScreenshotSampler::new(
                ffmpeg,
                runner,
                frame_dir.path().to_path_buf(),
                self.config.sample_count,
                self.config.margin_fraction,
            ),
            hasher: PerceptualHasher::new(self.config.hash_algorithm, self.config.hash_size),
        };

        let pool = self.thread_pool()?;
        let progress_bar = self.progress_bar(files.len());

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .map(|(index, file)| {
                    let outcome = self.process_file(index, file, &stages);
                    progress_bar.inc(1);
                    outcome
                })
                .collect()
        });

        progress_bar.finish_and_clear();

        if self.cancel.is_cancelled() {
            info!("Run cancelled; discarding partial results");
            return Err(Error::Interrupted);
        }

        let mut items = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Done(item) => items.push(item),
                FileOutcome::Skipped(skip) => skipped.push(skip),
                FileOutcome::Cancelled => return Err(Error::Interrupted),
                FileOutcome::Fatal(e) => return Err(e),
            }
        }

        let groups = SimilarityGrouper::new(self.config.similarity_threshold).group(&items);
        let groups = order_groups(&items, groups);

        info!(
            "Fingerprinted {} files, skipped {}, found {} duplicate groups in {:.1}s",
            items.len(),
            skipped.len(),
            groups.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(ScanReport::new(items, groups, skipped, files.len()))
    }

    /// Probe every video under `root`, longest first
    ///
    /// Nothing is sampled or hashed, so the returned items carry no
    /// fingerprints. Files that fail to probe are logged and left out.
    pub fn videos_by_duration(&self, root: &Path) -> Result<Vec<MediaItem>> {
        let files: Vec<MediaFile> = discovery::discover_media(root, &self.config)?
            .into_iter()
            .filter(|f| f.kind == MediaKind::Video)
            .collect();
        info!("Found {} videos under {}", files.len(), root.display());
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let tools = ToolPaths::resolve(self.config.tool_dir.as_deref())?;
        let probe = MediaProbe::new(Some(tools.ffprobe), self.runner());
        let pool = self.thread_pool()?;

        let probed: Vec<Result<Option<MediaItem>>> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    if self.cancel.is_cancelled() {
                        return Err(Error::Interrupted);
                    }
                    match probe.probe(file) {
                        Ok(info) => Ok(Some(media_item(file, info, Vec::new()))),
                        Err(e) if e.is_fatal() => Err(e),
                        Err(e) => {
                            logging::log_skip(&file.path, &SkipReason::Probe(detail(e)));
                            Ok(None)
                        }
                    }
                })
                .collect()
        });

        if self.cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }

        let mut items = probed
            .into_iter()
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>>>()?;
        order_by_duration(&mut items);
        Ok(items)
    }

    fn runner(&self) -> ToolRunner {
        ToolRunner::new(self.config.tool_timeout(), self.cancel.clone())
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads())
            .build()
            .map_err(|e| Error::Unknown(format!("Failed to build thread pool: {}", e)))
    }

    /// Probe, sample and hash one file
    fn process_file(&self, index: usize, file: &MediaFile, stages: &Stages) -> FileOutcome {
        if self.cancel.is_cancelled() {
            return FileOutcome::Cancelled;
        }

        let info = match stages.probe.probe(file) {
            Ok(info) => info,
            Err(e) if e.is_fatal() => return FileOutcome::Fatal(e),
            Err(e) => return skip(file, SkipReason::Probe(detail(e))),
        };

        let sampled = match stages.sampler.sample(index, file, &info) {
            Ok(sampled) => sampled,
            Err(e) if e.is_fatal() => return FileOutcome::Fatal(e),
            Err(e) => return skip(file, SkipReason::NoFrames(detail(e))),
        };

        if sampled.frames.is_empty() {
            let reason = sampled
                .failures
                .into_iter()
                .last()
                .map(detail)
                .unwrap_or_else(|| "no offsets to sample".to_string());
            return skip(file, SkipReason::NoFrames(reason));
        }

        let mut fingerprints = Vec::with_capacity(sampled.frames.len());
        for frame in &sampled.frames {
            match stages.hasher.hash(&file.path, &frame.image) {
                Ok(hash) => {
                    fingerprints.push(Fingerprint::new(hash, frame.sample, frame.offset))
                }
                Err(e) => return skip(file, SkipReason::Hash(detail(e))),
            }
        }

        debug!(
            "Fingerprinted {} ({} frames)",
            file.path.display(),
            fingerprints.len()
        );

        FileOutcome::Done(media_item(file, info, fingerprints))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("[{eta}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style);
        progress_bar.set_message("Fingerprinting media...");
        progress_bar.tick();
        progress_bar
    }
}

fn media_item(file: &MediaFile, info: MediaInfo, fingerprints: Vec<Fingerprint>) -> MediaItem {
    MediaItem {
        path: file.path.clone(),
        kind: file.kind,
        duration: info.duration,
        resolution: info.resolution,
        fps: info.fps,
        codec: info.codec,
        size: file.size,
        fingerprints,
    }
}

fn skip(file: &MediaFile, reason: SkipReason) -> FileOutcome {
    logging::log_skip(&file.path, &reason);
    FileOutcome::Skipped(SkippedFile {
        path: file.path.clone(),
        reason,
    })
}

/// The reason part of a per-file error, without the path it is reported under
fn detail(e: Error) -> String {
    match e {
        Error::Probe { reason, .. } | Error::Hash { reason, .. } => reason,
        Error::Sample { offset, reason, .. } => format!("at {:.3}s: {}", offset, reason),
        other => other.to_string(),
    }
}
