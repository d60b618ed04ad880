use log::{debug, warn};
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{MediaFile, MediaKind};

/// Discover video and image files under `root`
///
/// Paths are absolute and the result is sorted by path, so the same tree always
/// yields the same sequence.
pub fn discover_media(root: &Path, config: &Config) -> Result<Vec<MediaFile>> {
    if !root.exists() {
        return Err(Error::FileNotFound(root.to_path_buf()));
    }
    let root = root.canonicalize()?;

    let max_depth = if config.recursive {
        config.max_depth.unwrap_or(usize::MAX)
    } else {
        1
    };

    let mut files = Vec::new();

    let walker = WalkDir::new(&root)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(config.ignore_hidden && is_hidden(e)));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if is_ignored_name(path.strip_prefix(&root).unwrap_or(path), config) {
            debug!("Ignoring {}", path.display());
            continue;
        }

        let Some(kind) = media_kind(path) else {
            continue;
        };

        match fs::metadata(path) {
            Ok(metadata) => files.push(MediaFile {
                path: path.to_path_buf(),
                size: metadata.len(),
                kind,
            }),
            Err(e) => warn!("Error reading metadata for {}: {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Media kind from the extension, if the file is one we handle
pub fn media_kind(path: &Path) -> Option<MediaKind> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaKind::from_extension)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Partial names are matched against the path below the scan root
fn is_ignored_name(relative: &Path, config: &Config) -> bool {
    if config.ignore_partial_names.is_empty() {
        return false;
    }
    let relative = relative.to_string_lossy();
    config
        .ignore_partial_names
        .iter()
        .filter(|name| !name.is_empty())
        .any(|name| relative.contains(name.as_str()))
}

// -- Tests --
