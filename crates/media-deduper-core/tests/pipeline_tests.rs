mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use common::*;
use media_deduper_core::{Config, Error, MediaDeduper, ScanReport, SkipReason};
use tempfile::tempdir;

fn group_names(report: &ScanReport) -> Vec<Vec<String>> {
    report
        .groups()
        .iter()
        .map(|g| {
            report
                .members(g)
                .map(|m| m.path.file_name().unwrap().to_string_lossy().into_owned())
                .collect()
        })
        .collect()
}

fn skipped_name(report: &ScanReport, index: usize) -> String {
    report.skipped()[index]
        .path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned()
}

fn image_tree() -> tempfile::TempDir {
    let root = tempdir().unwrap();
    let dir = root.path();
    save_png(dir, "a.png", &block_pattern(1, 256));
    save_png(dir, "a_copy.png", &block_pattern(1, 256));
    save_png(dir, "a_small.png", &block_pattern(1, 128));
    save_png(dir, "b.png", &block_pattern(2, 256));
    fs::write(dir.join("garbage.png"), b"this is not a png").unwrap();
    fs::write(dir.join("notes.txt"), b"ignored").unwrap();
    root
}

#[test]
fn test_image_duplicates_grouped_and_ordered() {
    let root = image_tree();
    let report = MediaDeduper::new(test_config())
        .unwrap()
        .run(root.path())
        .unwrap();

    assert_eq!(
        group_names(&report),
        vec![vec!["a.png", "a_copy.png", "a_small.png"]]
    );
    assert_eq!(report.discovered(), 5);
    assert_eq!(report.items().len(), 4);

    assert_eq!(report.skipped().len(), 1);
    assert_eq!(skipped_name(&report, 0), "garbage.png");
    assert!(matches!(report.skipped()[0].reason, SkipReason::Probe(_)));
}

#[test]
fn test_image_only_run_needs_no_tools() {
    let root = image_tree();
    let empty_tools = tempdir().unwrap();
    let config = Config {
        tool_dir: Some(empty_tools.path().to_path_buf()),
        ..test_config()
    };

    let report = MediaDeduper::new(config).unwrap().run(root.path()).unwrap();
    assert_eq!(report.groups().len(), 1);
}

#[test]
fn test_runs_are_deterministic() {
    let root = image_tree();
    let first = MediaDeduper::new(Config {
        threads: 1,
        ..test_config()
    })
    .unwrap()
    .run(root.path())
    .unwrap();
    let second = MediaDeduper::new(Config {
        threads: 4,
        ..test_config()
    })
    .unwrap()
    .run(root.path())
    .unwrap();

    assert_eq!(group_names(&first), group_names(&second));
    assert_eq!(first.to_records(), second.to_records());
}

#[test]
fn test_mean_hash_finds_the_same_group() {
    let root = image_tree();
    let config = Config {
        hash_algorithm: media_deduper_core::HashAlgorithm::Mean,
        ..test_config()
    };
    let report = MediaDeduper::new(config).unwrap().run(root.path()).unwrap();
    assert_eq!(
        group_names(&report),
        vec![vec!["a.png", "a_copy.png", "a_small.png"]]
    );
}

#[test]
fn test_empty_directory() {
    let root = tempdir().unwrap();
    let report = MediaDeduper::new(test_config())
        .unwrap()
        .run(root.path())
        .unwrap();
    assert!(report.groups().is_empty());
    assert!(report.skipped().is_empty());
    assert_eq!(report.discovered(), 0);
}

#[test]
fn test_missing_root() {
    let result = MediaDeduper::new(test_config())
        .unwrap()
        .run(Path::new("/definitely/not/here"));
    assert!(matches!(result, Err(Error::FileNotFound(_))));
}

#[test]
fn test_cancelled_before_run() {
    let root = image_tree();
    let deduper = MediaDeduper::new(test_config()).unwrap();
    let token = deduper.cancel_token();
    token.cancel();

    assert!(matches!(deduper.run(root.path()), Err(Error::Interrupted)));

    token.reset();
    assert!(deduper.run(root.path()).is_ok());
}

#[test]
fn test_json_report_written() {
    let root = image_tree();
    let out = tempdir().unwrap();
    let json_path: PathBuf = out.path().join("report.json");

    let report = MediaDeduper::new(test_config())
        .unwrap()
        .run(root.path())
        .unwrap();
    report.write_json(&json_path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(value["groups"].as_array().unwrap().len(), 1);
    assert_eq!(value["groups"][0]["members"][0]["width"], 256);
    assert_eq!(value["skipped"][0]["reason"]["kind"], "probe");
}

#[cfg(unix)]
mod videos {
    use super::*;

    #[test]
    fn test_video_duplicates_with_skips() {
        let tools = FakeTools::new();
        let root = tempdir().unwrap();
        let dir = root.path();

        let shared = block_pattern(5, 256);
        tools.add_video(dir, "hd.mp4", &ffprobe_json(1920, 1080, 120.0, "h264"), Some(&shared));
        tools.add_video(dir, "sd.mkv", &ffprobe_json(1280, 720, 120.4, "hevc"), Some(&shared));
        tools.add_video(
            dir,
            "other.mp4",
            &ffprobe_json(1920, 1080, 30.0, "h264"),
            Some(&block_pattern(9, 256)),
        );
        tools.add_video(dir, "corrupt.mp4", "moov atom not found", None);
        tools.add_video(dir, "noframes.avi", &ffprobe_json(640, 480, 10.0, "mpeg4"), None);

        let report = MediaDeduper::new(tools.config())
            .unwrap()
            .run(dir)
            .unwrap();

        assert_eq!(group_names(&report), vec![vec!["hd.mp4", "sd.mkv"]]);

        let group = &report.groups()[0];
        let top = report.members(group).next().unwrap();
        assert_eq!(top.fingerprints.len(), 3);
        assert_eq!(top.duration, Some(120.0));
        assert_eq!(top.codec.as_deref(), Some("h264"));
        assert_eq!(top.fingerprints[0].offset_ms, Some(6_000));
        assert_eq!(top.fingerprints[2].offset_ms, Some(114_000));
        assert_eq!(top.fingerprints[2].sample, 2);

        let diff = group.differences(&report);
        assert!(diff.resolution && diff.codec);
        assert!(!diff.duration);

        assert_eq!(report.skipped().len(), 2);
        assert_eq!(skipped_name(&report, 0), "corrupt.mp4");
        assert!(matches!(report.skipped()[0].reason, SkipReason::Probe(_)));
        assert_eq!(skipped_name(&report, 1), "noframes.avi");
        assert!(matches!(report.skipped()[1].reason, SkipReason::NoFrames(_)));
    }

    #[test]
    fn test_videos_never_group_with_images() {
        let tools = FakeTools::new();
        let root = tempdir().unwrap();
        let frame = block_pattern(3, 256);

        tools.add_video(root.path(), "clip.mp4", &ffprobe_json(256, 256, 10.0, "h264"), Some(&frame));
        save_png(root.path(), "still.png", &frame);

        let report = MediaDeduper::new(tools.config())
            .unwrap()
            .run(root.path())
            .unwrap();
        assert!(report.groups().is_empty());
        assert_eq!(report.items().len(), 2);
    }

    #[test]
    fn test_single_sample_uses_midpoint() {
        let tools = FakeTools::new();
        let root = tempdir().unwrap();
        tools.add_video(
            root.path(),
            "clip.mp4",
            &ffprobe_json(320, 240, 40.0, "h264"),
            Some(&block_pattern(4, 64)),
        );

        let config = Config {
            sample_count: 1,
            ..tools.config()
        };
        let report = MediaDeduper::new(config).unwrap().run(root.path()).unwrap();
        assert_eq!(report.items()[0].fingerprints.len(), 1);
        assert_eq!(report.items()[0].fingerprints[0].offset_ms, Some(20_000));
    }

    #[test]
    fn test_missing_binary_fails_the_run() {
        let root = tempdir().unwrap();
        let empty_tools = tempdir().unwrap();
        fs::write(root.path().join("clip.mp4"), b"{}").unwrap();

        let config = Config {
            tool_dir: Some(empty_tools.path().to_path_buf()),
            ..test_config()
        };
        let result = MediaDeduper::new(config).unwrap().run(root.path());
        assert!(matches!(result, Err(Error::BinaryMissing { .. })));
    }

    #[test]
    fn test_cancel_during_run_interrupts_quickly() {
        let tools = FakeTools::new();
        let root = tempdir().unwrap();
        for n in 0..4 {
            tools.add_video(
                root.path(),
                &format!("stuck{}.mp4", n),
                &ffprobe_json(320, 240, 10.0, "h264"),
                None,
            );
        }

        let config = Config {
            tool_timeout_secs: 60,
            ..tools.config()
        };
        let deduper = MediaDeduper::new(config).unwrap();
        let token = deduper.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            token.cancel();
        });

        let started = Instant::now();
        let result = deduper.run(root.path());
        canceller.join().unwrap();

        assert!(matches!(result, Err(Error::Interrupted)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_timed_out_probe_skips_only_that_file() {
        let tools = FakeTools::new();
        let root = tempdir().unwrap();
        tools.add_video(
            root.path(),
            "clip.mp4",
            &ffprobe_json(320, 240, 10.0, "h264"),
            Some(&block_pattern(6, 64)),
        );
        tools.add_video(root.path(), "stuck.mp4", &ffprobe_json(320, 240, 10.0, "h264"), None);

        let config = Config {
            tool_timeout_secs: 1,
            ..tools.config()
        };
        let started = Instant::now();
        let report = MediaDeduper::new(config).unwrap().run(root.path()).unwrap();
        assert!(started.elapsed() < Duration::from_secs(30));

        assert_eq!(report.items().len(), 1);
        assert_eq!(report.items()[0].path.file_name().unwrap(), "clip.mp4");
        assert_eq!(report.skipped().len(), 1);
        assert_eq!(skipped_name(&report, 0), "stuck.mp4");
        match &report.skipped()[0].reason {
            SkipReason::Probe(detail) => assert!(detail.contains("timed out"), "{}", detail),
            other => panic!("expected a probe skip, got {:?}", other),
        }
    }

    #[test]
    fn test_videos_by_duration_lists_longest_first() {
        let tools = FakeTools::new();
        let root = tempdir().unwrap();
        let dir = root.path();
        tools.add_video(dir, "short.mp4", &ffprobe_json(640, 360, 42.0, "h264"), None);
        tools.add_video(dir, "feature.mkv", &ffprobe_json(1920, 1080, 5400.5, "hevc"), None);
        tools.add_video(dir, "corrupt.mp4", "moov atom not found", None);
        save_png(dir, "still.png", &block_pattern(1, 64));

        let videos = MediaDeduper::new(tools.config())
            .unwrap()
            .videos_by_duration(dir)
            .unwrap();

        let names: Vec<String> = videos
            .iter()
            .map(|m| m.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["feature.mkv", "short.mp4"]);
        assert_eq!(videos[0].codec.as_deref(), Some("hevc"));
        assert_eq!(videos[0].fps, Some(25.0));
        assert!(videos.iter().all(|m| m.fingerprints.is_empty()));
    }
}
