//! The result of a run and its serialized form.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{DuplicateGroup, MediaItem, SkippedFile};

/// Everything a completed run found
///
/// Owns the item arena; each [`DuplicateGroup`] holds indices into it.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    items: Vec<MediaItem>,
    groups: Vec<DuplicateGroup>,
    skipped: Vec<SkippedFile>,
    discovered: usize,
}

impl ScanReport {
    pub(crate) fn new(
        items: Vec<MediaItem>,
        groups: Vec<DuplicateGroup>,
        skipped: Vec<SkippedFile>,
        discovered: usize,
    ) -> Self {
        Self {
            items,
            groups,
            skipped,
            discovered,
        }
    }

    /// Groups in presentation order
    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    /// Members of `group`, best candidate to keep first
    pub fn members<'a>(
        &'a self,
        group: &'a DuplicateGroup,
    ) -> impl Iterator<Item = &'a MediaItem> + 'a {
        group.indices().iter().map(move |&i| &self.items[i])
    }

    /// Every successfully fingerprinted item, grouped or not
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Number of candidate files found before processing
    pub fn discovered(&self) -> usize {
        self.discovered
    }

    /// Files that have at least one duplicate
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::len).sum()
    }

    /// Flat, serializable view of the report
    pub fn to_records(&self) -> ReportRecord {
        ReportRecord {
            groups: self
                .groups
                .iter()
                .enumerate()
                .map(|(n, group)| GroupRecord {
                    group: n + 1,
                    members: self.members(group).map(MemberRecord::from).collect(),
                })
                .collect(),
            skipped: self.skipped.clone(),
        }
    }

    /// Write [`ScanReport::to_records`] as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &self.to_records())?;
        Ok(())
    }
}

/// Which properties are not shared by every member of a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDiff {
    pub resolution: bool,
    pub duration: bool,
    pub size: bool,
    pub fps: bool,
    pub codec: bool,
}

impl PropertyDiff {
    pub fn any(&self) -> bool {
        self.resolution || self.duration || self.size || self.fps || self.codec
    }
}

impl DuplicateGroup {
    /// Compare members of this group property by property
    ///
    /// Durations are compared in whole seconds, frame rates to two decimals.
    pub fn differences(&self, report: &ScanReport) -> PropertyDiff {
        let members: Vec<&MediaItem> = report.members(self).collect();

        PropertyDiff {
            resolution: differs(&members, |m| m.resolution),
            duration: differs(&members, |m| m.duration.map(|d| d.trunc() as u64)),
            size: differs(&members, |m| m.size),
            fps: differs(&members, |m| m.fps.map(|f| (f * 100.0).round() as i64)),
            codec: differs(&members, |m| m.codec.clone()),
        }
    }
}

fn differs<T: PartialEq>(members: &[&MediaItem], key: impl Fn(&MediaItem) -> T) -> bool {
    let mut keys = members.iter().map(|&m| key(m));
    match keys.next() {
        Some(first) => keys.any(|k| k != first),
        None => false,
    }
}

/// Serialized report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub groups: Vec<GroupRecord>,
    pub skipped: Vec<SkippedFile>,
}

/// One duplicate group; `group` numbers start at 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub group: usize,
    pub members: Vec<MemberRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub duration: Option<f64>,
    pub size: u64,
    pub fps: Option<f64>,
    pub codec: Option<String>,
}

impl From<&MediaItem> for MemberRecord {
    fn from(item: &MediaItem) -> Self {
        Self {
            path: item.path.clone(),
            width: item.resolution.width,
            height: item.resolution.height,
            duration: item.duration,
            size: item.size,
            fps: item.fps,
            codec: item.codec.clone(),
        }
    }
}
