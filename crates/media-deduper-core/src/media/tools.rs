//! Locating and running the external `ffprobe` / `ffmpeg` binaries.
//!
//! Every invocation runs under a timeout and observes the run's [`CancelToken`];
//! a child that overstays either is killed.

use log::{debug, warn};
use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

pub const FFPROBE: &str = "ffprobe";
pub const FFMPEG: &str = "ffmpeg";

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Failure of a single external tool invocation
#[derive(Error, Debug)]
pub enum ToolError {
    /// The binary vanished or is not executable
    #[error("could not start {program}: {source}")]
    Missing { program: PathBuf, source: io::Error },

    #[error("failed to run {program}: {source}")]
    Io { program: PathBuf, source: io::Error },

    #[error("{program} timed out after {}s", .timeout.as_secs_f64())]
    TimedOut { program: String, timeout: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl ToolError {
    /// Lift into the crate error when the failure concerns the whole run
    pub fn into_fatal(self) -> std::result::Result<Error, ToolError> {
        match self {
            ToolError::Missing { program, source } => Ok(Error::BinaryMissing {
                tool: program.display().to_string(),
                searched: source.to_string(),
            }),
            ToolError::Cancelled => Ok(Error::Interrupted),
            other => Err(other),
        }
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Resolved locations of both binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl ToolPaths {
    /// Look both binaries up in `tool_dir`, or in `PATH` when no directory is configured
    pub fn resolve(tool_dir: Option<&Path>) -> Result<Self> {
        Ok(Self {
            ffprobe: locate(FFPROBE, tool_dir)?,
            ffmpeg: locate(FFMPEG, tool_dir)?,
        })
    }
}

/// Find one binary
///
/// An explicit `tool_dir` is the only place searched; there is no fallback to `PATH`.
pub fn locate(tool: &str, tool_dir: Option<&Path>) -> Result<PathBuf> {
    match tool_dir {
        Some(dir) => locate_on(tool, dir.as_os_str(), dir),
        None => which::which(tool)
            .map(|path| {
                debug!("{} found at {}", tool, path.display());
                path
            })
            .map_err(|_| Error::BinaryMissing {
                tool: tool.to_string(),
                searched: "PATH".to_string(),
            }),
    }
}

/// Find an executable `tool` in a `PATH`-style list of directories
pub fn locate_on(tool: &str, search: &OsStr, cwd: &Path) -> Result<PathBuf> {
    match which::which_in(tool, Some(search), cwd) {
        Ok(path) => {
            debug!("{} found at {}", tool, path.display());
            Ok(path)
        }
        Err(_) => Err(Error::BinaryMissing {
            tool: tool.to_string(),
            searched: search.to_string_lossy().into_owned(),
        }),
    }
}

/// Runs external binaries with a timeout and cancellation
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
    cancel: CancelToken,
}

impl ToolRunner {
    pub fn new(timeout: Duration, cancel: CancelToken) -> Self {
        Self { timeout, cancel }
    }

    /// Run `program` to completion
    ///
    /// Success means exit status zero; stdout and stderr are captured in full.
    pub fn run<I, S>(&self, program: &Path, args: I) -> std::result::Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if self.cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ToolError::Missing {
                    program: program.to_path_buf(),
                    source,
                },
                _ => ToolError::Io {
                    program: program.to_path_buf(),
                    source,
                },
            })?;

        // Drain both pipes so a chatty child never blocks on a full buffer
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    kill(&mut child);
                    let _ = (stdout.join(), stderr.join());
                    return Err(ToolError::Io {
                        program: program.to_path_buf(),
                        source,
                    });
                }
            }

            if self.cancel.is_cancelled() {
                kill(&mut child);
                let _ = (stdout.join(), stderr.join());
                return Err(ToolError::Cancelled);
            }

            if Instant::now() >= deadline {
                kill(&mut child);
                let _ = (stdout.join(), stderr.join());
                warn!(
                    "TIMEOUT: {} took longer than {:?}",
                    program.display(),
                    self.timeout
                );
                return Err(ToolError::TimedOut {
                    program: program_name(program),
                    timeout: self.timeout,
                });
            }

            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(ToolError::Failed {
                program: program_name(program),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}
