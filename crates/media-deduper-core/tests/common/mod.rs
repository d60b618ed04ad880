#![allow(dead_code)]

use image::{DynamicImage, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

use media_deduper_core::Config;

/// 8×8 grid of pseudo-random colored blocks; the same seed at any side length
/// is the same picture rescaled
pub fn block_pattern(seed: u32, side: u32) -> DynamicImage {
    let block = side / 8;
    let mut img = RgbImage::new(side, side);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let cell = (y / block) * 8 + (x / block);
        let mut h = cell ^ seed.wrapping_mul(0x9E37_79B9);
        h ^= h >> 16;
        h = h.wrapping_mul(0x85EB_CA6B);
        h ^= h >> 13;
        h = h.wrapping_mul(0xC2B2_AE35);
        h ^= h >> 16;
        *px = Rgb([(h >> 24) as u8, (h >> 16) as u8, (h >> 8) as u8]);
    }
    DynamicImage::ImageRgb8(img)
}

pub fn save_png(dir: &Path, name: &str, img: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, image::ImageFormat::Png).unwrap();
    path
}

/// No progress bar, and a threshold with headroom for resampling noise
pub fn test_config() -> Config {
    Config {
        similarity_threshold: 8.0,
        show_progress: false,
        tool_timeout_secs: 10,
        ..Config::default()
    }
}

pub fn ffprobe_json(width: u32, height: u32, duration: f64, codec: &str) -> String {
    format!(
        r#"{{
    "streams": [
        {{ "codec_name": "{}", "width": {}, "height": {}, "avg_frame_rate": "25/1" }}
    ],
    "format": {{ "duration": "{:.6}" }}
}}"#,
        codec, width, height, duration
    )
}

/// Stand-in `ffprobe` / `ffmpeg` pair living in a temporary tool directory
///
/// A fake video file holds the JSON the fake `ffprobe` prints for it; a file
/// whose name starts with `stuck` makes `ffprobe` hang for a minute. The fake
/// `ffmpeg` copies `<frames>/<video file name>.png` to its output path for any
/// offset, and fails when no such frame exists.
#[cfg(unix)]
pub struct FakeTools {
    pub tool_dir: tempfile::TempDir,
    pub frame_dir: tempfile::TempDir,
}

#[cfg(unix)]
impl FakeTools {
    pub fn new() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let tool_dir = tempfile::tempdir().unwrap();
        let frame_dir = tempfile::tempdir().unwrap();

        let ffprobe = "#!/bin/sh\n\
                       for arg in \"$@\"; do last=\"$arg\"; done\n\
                       case \"$(basename \"$last\")\" in stuck*) exec sleep 60;; esac\n\
                       cat \"$last\"\n"
            .to_string();
        let ffmpeg = format!(
            "#!/bin/sh\n\
             prev=\"\"\n\
             for arg in \"$@\"; do\n\
               if [ \"$prev\" = \"-i\" ]; then input=\"$arg\"; fi\n\
               prev=\"$arg\"\n\
               out=\"$arg\"\n\
             done\n\
             frame=\"{}/$(basename \"$input\").png\"\n\
             if [ ! -f \"$frame\" ]; then echo \"no frame for $input\" >&2; exit 1; fi\n\
             cp \"$frame\" \"$out\"\n",
            frame_dir.path().display()
        );

        for (name, script) in [("ffprobe", ffprobe), ("ffmpeg", ffmpeg)] {
            let path = tool_dir.path().join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        Self {
            tool_dir,
            frame_dir,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            tool_dir: Some(self.tool_dir.path().to_path_buf()),
            ..test_config()
        }
    }

    /// Create a fake video under `root`; `frame` is what every screenshot shows
    pub fn add_video(
        &self,
        root: &Path,
        name: &str,
        metadata: &str,
        frame: Option<&DynamicImage>,
    ) -> PathBuf {
        let path = root.join(name);
        fs::write(&path, metadata).unwrap();
        if let Some(frame) = frame {
            save_png(self.frame_dir.path(), &format!("{}.png", name), frame);
        }
        path
    }
}
