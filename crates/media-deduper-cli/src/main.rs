use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use media_deduper_core::config::LogLevel;
use media_deduper_core::processing::PerceptualHasher;
use media_deduper_core::{logging, Config, Error, HashAlgorithm, MediaDeduper, ScanReport};
use std::path::{Path, PathBuf};

mod format;
mod remove;

use format::{duration_line, member_line, size_to_str};
use remove::{remove_path, Removal};

#[derive(Parser)]
#[command(name = "media-deduper")]
#[command(about = "Find visually duplicated videos and images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    Dct,
    Mean,
}

impl From<Algorithm> for HashAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::Dct => HashAlgorithm::Dct,
            Algorithm::Mean => HashAlgorithm::Mean,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory for duplicate media
    Scan {
        /// Directory to scan
        root: PathBuf,

        /// Frames sampled per video
        #[arg(long = "samples")]
        sample_count: Option<usize>,

        /// Maximum mean Hamming distance between duplicates
        #[arg(long)]
        threshold: Option<f64>,

        /// Fraction of each video skipped at both ends
        #[arg(long)]
        margin: Option<f64>,

        /// Hash side length; the hash has N² bits
        #[arg(long)]
        hash_size: Option<u32>,

        #[arg(long, value_enum)]
        algorithm: Option<Algorithm>,

        /// Worker threads (0 = one per CPU)
        #[arg(long)]
        threads: Option<usize>,

        /// Directory holding ffprobe and ffmpeg
        #[arg(long, env = "MEDIA_DEDUPER_TOOL_DIR")]
        tool_dir: Option<PathBuf>,

        /// Seconds before an external tool call is killed
        #[arg(long = "timeout")]
        timeout_secs: Option<u64>,

        /// Only scan the top directory
        #[arg(long)]
        no_recursive: bool,

        /// Include files and directories starting with '.'
        #[arg(long)]
        include_hidden: bool,

        /// Skip paths containing any of these strings
        #[arg(long, value_delimiter = ',')]
        ignore_partial_names: Vec<String>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,

        /// Also write the report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Write logs to rotating files in this directory instead of stderr
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Print the perceptual hashes of two images and their distance
    Compare {
        first: PathBuf,
        second: PathBuf,

        #[arg(long, value_enum, default_value = "dct")]
        algorithm: Algorithm,

        /// Hash side length; the hash has N² bits
        #[arg(long, default_value_t = 8)]
        hash_size: u32,
    },

    /// List videos longest first with resolution, frame rate and codec
    ByDuration {
        /// Directory to scan
        root: PathBuf,

        /// Directory holding ffprobe and ffmpeg
        #[arg(long, env = "MEDIA_DEDUPER_TOOL_DIR")]
        tool_dir: Option<PathBuf>,

        /// Seconds before an ffprobe call is killed
        #[arg(long = "timeout")]
        timeout_secs: Option<u64>,

        /// Worker threads (0 = one per CPU)
        #[arg(long)]
        threads: Option<usize>,

        /// Only scan the top directory
        #[arg(long)]
        no_recursive: bool,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "media-deduper.json")]
        path: PathBuf,
    },

    /// Delete files, or move them aside with --move-to
    Remove {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Move into this directory instead of deleting
        #[arg(long)]
        move_to: Option<PathBuf>,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            root,
            sample_count,
            threshold,
            margin,
            hash_size,
            algorithm,
            threads,
            tool_dir,
            timeout_secs,
            no_recursive,
            include_hidden,
            ignore_partial_names,
            no_progress,
            json,
            config,
            verbose,
            log_dir,
        } => {
            let mut config = match config {
                Some(config_path) => Config::from_file(&config_path)?,
                None => Config::default(),
            };

            // Override config with command line arguments
            if let Some(v) = sample_count {
                config.sample_count = v;
            }
            if let Some(v) = threshold {
                config.similarity_threshold = v;
            }
            if let Some(v) = margin {
                config.margin_fraction = v;
            }
            if let Some(v) = hash_size {
                config.hash_size = v;
            }
            if let Some(v) = algorithm {
                config.hash_algorithm = v.into();
            }
            if let Some(v) = threads {
                config.threads = v;
            }
            if tool_dir.is_some() {
                config.tool_dir = tool_dir;
            }
            if let Some(v) = timeout_secs {
                config.tool_timeout_secs = v;
            }
            if no_recursive {
                config.recursive = false;
            }
            if include_hidden {
                config.ignore_hidden = false;
            }
            if !ignore_partial_names.is_empty() {
                config.ignore_partial_names = ignore_partial_names;
            }
            config.show_progress = !no_progress;
            if verbose > 0 {
                config.log_level = LogLevel::from_verbosity(verbose);
            }

            init_logging(log_dir.as_deref(), config.log_level)?;

            let deduper = MediaDeduper::new(config)?;

            let cancel = deduper.cancel_token();
            ctrlc::set_handler(move || {
                eprintln!("Interrupted, stopping...");
                cancel.cancel();
            })
            .context("installing Ctrl-C handler")?;

            info!("Starting scan of {}", root.display());
            let report = match deduper.run(&root) {
                Ok(report) => report,
                Err(Error::Interrupted) => bail!("scan cancelled"),
                Err(e) => return Err(e.into()),
            };

            print_report(&report);

            if let Some(path) = json {
                report.write_json(&path)?;
                println!("Report written to: {}", path.display());
            }
            Ok(())
        }

        Commands::Compare {
            first,
            second,
            algorithm,
            hash_size,
        } => {
            let config = Config {
                hash_algorithm: algorithm.into(),
                hash_size,
                ..Config::default()
            };
            config.validate()?;

            let hasher = PerceptualHasher::new(config.hash_algorithm, config.hash_size);
            let a = hasher
                .hash_file(&first)
                .with_context(|| format!("hashing {}", first.display()))?;
            let b = hasher
                .hash_file(&second)
                .with_context(|| format!("hashing {}", second.display()))?;

            println!("{}  {}", a.to_hex(), first.display());
            println!("{}  {}", b.to_hex(), second.display());
            match a.distance(&b) {
                Some(distance) => println!("distance: {} of {} bits", distance, a.bit_len()),
                None => bail!("hashes have different lengths"),
            }
            Ok(())
        }

        Commands::ByDuration {
            root,
            tool_dir,
            timeout_secs,
            threads,
            no_recursive,
            verbose,
        } => {
            let mut config = Config {
                tool_dir,
                log_level: LogLevel::from_verbosity(verbose),
                ..Config::default()
            };
            if let Some(v) = timeout_secs {
                config.tool_timeout_secs = v;
            }
            if let Some(v) = threads {
                config.threads = v;
            }
            if no_recursive {
                config.recursive = false;
            }

            init_logging(None, config.log_level)?;

            let deduper = MediaDeduper::new(config)?;
            let cancel = deduper.cancel_token();
            ctrlc::set_handler(move || cancel.cancel())
                .context("installing Ctrl-C handler")?;

            let videos = match deduper.videos_by_duration(&root) {
                Ok(videos) => videos,
                Err(Error::Interrupted) => bail!("listing cancelled"),
                Err(e) => return Err(e.into()),
            };
            for video in &videos {
                println!("{}", duration_line(video));
            }
            println!("{} videos", videos.len());
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }

        Commands::Remove { paths, move_to } => {
            env_logger::Builder::new()
                .filter_level(log::LevelFilter::Info)
                .parse_env(logging::LOG_ENV)
                .init();

            let mut failed = 0;
            for path in &paths {
                match remove_path(path, move_to.as_deref()) {
                    Ok(Removal::Deleted(path)) => println!("deleted  {}", path.display()),
                    Ok(Removal::Moved { from, to }) => {
                        println!("moved    {} -> {}", from.display(), to.display())
                    }
                    Err(e) => {
                        failed += 1;
                        warn!("{:#}", e);
                        println!("FAILED   {}: {:#}", path.display(), e);
                    }
                }
            }

            if failed > 0 {
                bail!("{} of {} paths could not be removed", failed, paths.len());
            }
            Ok(())
        }
    }
}

/// File logging when a directory is given, stderr otherwise
fn init_logging(log_dir: Option<&Path>, level: LogLevel) -> anyhow::Result<()> {
    match log_dir {
        Some(dir) => {
            logging::init_logger(dir, level.to_level_filter())?;
        }
        None => {
            env_logger::Builder::new()
                .filter_level(level.to_level_filter())
                .parse_env(logging::LOG_ENV)
                .init();
        }
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    for (n, group) in report.groups().iter().enumerate() {
        println!("Group {} ({} files):", n + 1, group.len());
        let diff = group.differences(report);
        for item in report.members(group) {
            println!("{}", member_line(item, &diff));
        }
        println!();
    }

    if !report.skipped().is_empty() {
        println!("Skipped {} files:", report.skipped().len());
        for skipped in report.skipped() {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
        println!();
    }

    let reclaimable: u64 = report
        .groups()
        .iter()
        .flat_map(|g| report.members(g).skip(1))
        .map(|item| item.size)
        .sum();

    println!(
        "Scanned {} files: {} duplicate groups, {} files involved, {} reclaimable",
        report.discovered(),
        report.groups().len(),
        report.duplicate_count(),
        size_to_str(reclaimable)
    );
}
