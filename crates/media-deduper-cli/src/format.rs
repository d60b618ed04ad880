//! Human-readable rendering of durations, sizes and groups.

use media_deduper_core::{MediaItem, PropertyDiff};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// `HH:MM:SS`; hours are not wrapped
pub fn seconds_to_str(total_seconds: f64) -> String {
    let total = if total_seconds.is_finite() && total_seconds > 0.0 {
        total_seconds as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Size with a 1024-based unit, one decimal
pub fn size_to_str(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", value, UNITS[unit])
}

/// One line per member; properties that differ within the group are starred
pub fn member_line(item: &MediaItem, diff: &PropertyDiff) -> String {
    let mark = |differs: bool, text: String| {
        if differs {
            format!("*{}", text)
        } else {
            text
        }
    };

    let mut fields = vec![mark(diff.resolution, item.resolution.to_string())];
    if let Some(duration) = item.duration {
        fields.push(mark(diff.duration, seconds_to_str(duration)));
    }
    fields.push(mark(diff.size, size_to_str(item.size)));
    if let Some(fps) = item.fps {
        fields.push(mark(diff.fps, format!("{:.2}fps", fps)));
    }
    if let Some(codec) = &item.codec {
        fields.push(mark(diff.codec, codec.clone()));
    }

    format!("  {}  [{}]", item.path.display(), fields.join(", "))
}

/// `HH:MM:SS  WxH  fps  codec  path`, for listings sorted by duration
pub fn duration_line(item: &MediaItem) -> String {
    let duration = item
        .duration
        .map(seconds_to_str)
        .unwrap_or_else(|| "--:--:--".to_string());
    let fps = item
        .fps
        .map(|f| format!("{:.2}fps", f))
        .unwrap_or_else(|| "?fps".to_string());
    format!(
        "{}  {:>9}  {:>9}  {:<6}  {}",
        duration,
        item.resolution.to_string(),
        fps,
        item.codec.as_deref().unwrap_or("?"),
        item.path.display()
    )
}
