//! Presentation order of groups and their members.
//!
//! The member listed first in a group is the one most worth keeping: highest
//! resolution, then largest file, then path as a stable tiebreak.

use std::cmp::Ordering;

use crate::types::{DuplicateGroup, MediaItem};

/// Best-first comparison of two members
pub fn compare_members(a: &MediaItem, b: &MediaItem) -> Ordering {
    b.resolution
        .pixels()
        .cmp(&a.resolution.pixels())
        .then_with(|| b.size.cmp(&a.size))
        .then_with(|| a.path.cmp(&b.path))
}

/// Longest first; unknown durations last, path as the tiebreak
pub fn order_by_duration(items: &mut [MediaItem]) {
    items.sort_by(|a, b| match (a.duration, b.duration) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.path.cmp(&b.path)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    });
}

/// Sort each group's members best-first, then sort the groups
///
/// Groups are ordered by their top member's resolution (descending), then by
/// size of the group (descending), then by the top member's path. The result is
/// a pure function of the items, independent of worker scheduling.
pub fn order_groups(items: &[MediaItem], groups: Vec<Vec<usize>>) -> Vec<DuplicateGroup> {
    let mut groups: Vec<Vec<usize>> = groups
        .into_iter()
        .map(|mut members| {
            members.sort_by(|&a, &b| compare_members(&items[a], &items[b]));
            members
        })
        .collect();

    groups.sort_by(|a, b| {
        let (top_a, top_b) = (&items[a[0]], &items[b[0]]);
        top_b
            .resolution
            .pixels()
            .cmp(&top_a.resolution.pixels())
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| top_a.path.cmp(&top_b.path))
    });

    groups.into_iter().map(DuplicateGroup::new).collect()
}
