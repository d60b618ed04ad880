//! Deleting or moving files the user picked from a report.

use anyhow::{bail, Context, Result};
use media_deduper_core::logging::log_fs_modification;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one path
#[derive(Debug)]
pub enum Removal {
    Deleted(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
}

/// Delete `path`, or move it into `move_to` keeping its file name
pub fn remove_path(path: &Path, move_to: Option<&Path>) -> Result<Removal> {
    if !path.is_file() {
        bail!("{} is not a regular file", path.display());
    }

    match move_to {
        None => {
            fs::remove_file(path).with_context(|| format!("deleting {}", path.display()))?;
            log_fs_modification("delete", path, None);
            Ok(Removal::Deleted(path.to_path_buf()))
        }
        Some(dir) => {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            let name = path
                .file_name()
                .with_context(|| format!("{} has no file name", path.display()))?;
            let target = dir.join(name);
            if target.exists() {
                bail!("{} already exists", target.display());
            }

            // rename fails across filesystems; fall back to copy + delete
            if fs::rename(path, &target).is_err() {
                fs::copy(path, &target).with_context(|| {
                    format!("copying {} to {}", path.display(), target.display())
                })?;
                fs::remove_file(path).with_context(|| format!("deleting {}", path.display()))?;
            }

            log_fs_modification(
                "move",
                path,
                Some(&format!("to {}", target.display())),
            );
            Ok(Removal::Moved {
                from: path.to_path_buf(),
                to: target,
            })
        }
    }
}
