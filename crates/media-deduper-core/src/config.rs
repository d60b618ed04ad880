use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Perceptual hash algorithm used for every frame of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// Frequency-domain hash over the low DCT coefficients
    Dct,

    /// Average hash: pixels compared against the mean brightness
    Mean,
}

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Map a `-v` count onto a level
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Configuration for a duplicate-detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of frames sampled per video
    pub sample_count: usize,

    /// Fraction of the duration skipped at both ends when sampling
    pub margin_fraction: f64,

    /// Maximum average Hamming distance for two items to be linked
    pub similarity_threshold: f64,

    /// Side of the hash grid; fingerprints are `hash_size²` bits long
    pub hash_size: u32,

    /// Hash algorithm applied to every frame
    pub hash_algorithm: HashAlgorithm,

    /// Number of worker threads (0 = auto)
    pub threads: usize,

    /// Directory holding `ffprobe` and `ffmpeg`; `None` searches `PATH`
    pub tool_dir: Option<PathBuf>,

    /// Timeout applied to every external tool invocation, in seconds
    pub tool_timeout_secs: u64,

    /// Whether to descend into subdirectories
    pub recursive: bool,

    /// Maximum directory depth for scanning
    pub max_depth: Option<usize>,

    /// Whether to skip dot-files and dot-directories
    pub ignore_hidden: bool,

    /// Paths containing any of these fragments are not scanned
    pub ignore_partial_names: Vec<String>,

    /// Whether to draw a progress bar while processing files
    pub show_progress: bool,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_count: 3,
            margin_fraction: 0.05,
            similarity_threshold: 4.0,
            hash_size: 8,
            hash_algorithm: HashAlgorithm::Dct,
            threads: 0, // Auto
            tool_dir: None,
            tool_timeout_secs: 30,
            recursive: true,
            max_depth: None,
            ignore_hidden: true,
            ignore_partial_names: Vec::new(),
            show_progress: false,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_count == 0 {
            return Err(Error::Configuration(
                "Sample count must be at least 1".to_string(),
            ));
        }

        if !(0.0..0.5).contains(&self.margin_fraction) {
            return Err(Error::Configuration(
                "Margin fraction must be in [0, 0.5)".to_string(),
            ));
        }

        if !self.similarity_threshold.is_finite() || self.similarity_threshold < 0.0 {
            return Err(Error::Configuration(
                "Similarity threshold must be a non-negative number".to_string(),
            ));
        }

        if !(2..=32).contains(&self.hash_size) {
            return Err(Error::Configuration(
                "Hash size must be between 2 and 32".to_string(),
            ));
        }

        if self.tool_timeout_secs == 0 {
            return Err(Error::Configuration(
                "Tool timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }

    /// Effective worker count
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.sample_count = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = Config::default();
        config.margin_fraction = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.similarity_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.hash_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.sample_count = 5;
        config.hash_algorithm = HashAlgorithm::Mean;
        config.tool_dir = Some(PathBuf::from("/opt/ffmpeg/bin"));
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.sample_count, 5);
        assert_eq!(loaded.hash_algorithm, HashAlgorithm::Mean);
        assert_eq!(loaded.tool_dir, Some(PathBuf::from("/opt/ffmpeg/bin")));
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "similarity_threshold": 7.5 }"#).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.similarity_threshold, 7.5);
        assert_eq!(loaded.sample_count, 3);
    }

    #[test]
    fn test_worker_threads_auto() {
        let config = Config::default();
        assert!(config.worker_threads() >= 1);

        let mut config = Config::default();
        config.threads = 3;
        assert_eq!(config.worker_threads(), 3);
    }
}
