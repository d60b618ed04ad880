use log::{error, info, warn, LevelFilter};
use std::path::{Path, PathBuf};

// For file-based logging with rotation
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::error::{Error, Result};
use crate::types::SkipReason;

/// Environment variable overriding the configured level, e.g. `MEDIA_DEDUP_LOG=debug`
pub const LOG_ENV: &str = "MEDIA_DEDUP_LOG";

const LOG_FILE_NAME: &str = "media-deduper.log";
const ROTATE_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ARCHIVES: u32 = 5;

/// Initialize file logging with timestamp, level and module path
///
/// Logs go to the file only so they never interleave with the progress bar.
/// Returns the path of the active log file.
pub fn init_logger(log_dir: &Path, level: LevelFilter) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;

    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let archived_logs_pattern = log_dir.join("media-deduper.{}.log");

    let file_trigger = SizeTrigger::new(ROTATE_BYTES);
    let file_roller = FixedWindowRoller::builder()
        .build(&archived_logs_pattern.to_string_lossy(), KEEP_ARCHIVES)
        .map_err(|e| Error::Configuration(format!("Failed to create log roller: {}", e)))?;
    let compound_policy = CompoundPolicy::new(Box::new(file_trigger), Box::new(file_roller));

    let rolling_file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{M}:{L}] - {m}{n}",
        )))
        .build(&log_file_path, Box::new(compound_policy))?;

    let level = level_override(std::env::var(LOG_ENV).ok().as_deref()).unwrap_or(level);

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(rolling_file)))
        .build(Root::builder().appender("file").build(level))
        .map_err(|e| Error::Configuration(format!("Failed to build log config: {}", e)))?;

    log4rs::init_config(config)
        .map_err(|e| Error::Configuration(format!("Failed to initialize log4rs: {}", e)))?;

    info!("media-deduper started");
    info!("Logging to file: {}", log_file_path.display());
    Ok(log_file_path)
}

/// Parse the level override from the environment, ignoring junk
pub fn level_override(value: Option<&str>) -> Option<LevelFilter> {
    value.and_then(|v| v.trim().parse::<LevelFilter>().ok())
}

/// Log a file that was left out of grouping
pub fn log_skip(path: &Path, reason: &SkipReason) {
    match reason {
        SkipReason::Hash(_) => error!("SKIP - Path: {}, Reason: {}", path.display(), reason),
        _ => warn!("SKIP - Path: {}, Reason: {}", path.display(), reason),
    }
}

/// Log a failed external tool invocation
pub fn log_tool_failure(tool: &str, path: &Path, error: &dyn std::error::Error) {
    warn!(
        "Tool invocation failed - Tool: {}, Path: {}, Error: {}",
        tool,
        path.display(),
        error
    );
}

/// Log file system modification
pub fn log_fs_modification(operation: &str, path: &Path, details: Option<&str>) {
    let details_str = details.unwrap_or("");
    info!(
        "FS CHANGE - Operation: {}, Path: {}{}",
        operation,
        path.display(),
        if details_str.is_empty() {
            "".to_string()
        } else {
            format!(", Details: {}", details_str)
        }
    );
}
