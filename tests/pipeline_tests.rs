// Pipeline tests
// Full runs from an input tree to an output tree (or in place)

mod common;

use asset_optimizer::data_processor::DataProcessor;
use asset_optimizer::image_processor::ImageProcessor;
use asset_optimizer::optimizer::MANIFEST_NAME;
use asset_optimizer::vector_processor::VectorProcessor;
use asset_optimizer::video_processor::VideoProcessor;
use asset_optimizer::{configure, AssetOptimizer, Config, Encoders, OptimizeError};
use common::{encoders_with_fake_images, list_files, path_str, write_tree, FakeImageEncoder, OverlapCounter};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_test::assert_ok;

const PRETTY_JSON: &[u8] = b"{\n    \"name\": \"site\",\n    \"version\": 1.50,\n    \"tags\": [ \"a\", \"b\" ]\n}\n";

#[tokio::test]
async fn test_json_minified_and_unknown_copied() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(input.path(), &[("data/site.json", PRETTY_JSON), ("notes.xyz", b"opaque bytes")]);

    let report = assert_ok!(configure(path_str(input.path()), path_str(output.path()), Config::default()).await);

    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.files_optimized, 1);
    assert!(report.warnings.is_empty());

    let minified = std::fs::read(output.path().join("data/site.json")).unwrap();
    assert_eq!(minified, br#"{"name":"site","version":1.50,"tags":["a","b"]}"#);
    assert_eq!(std::fs::read(output.path().join("notes.xyz")).unwrap(), b"opaque bytes");

    assert_eq!(report.total_original_size, PRETTY_JSON.len() as u64);
    assert_eq!(report.total_optimized_size, minified.len() as u64);
    assert!(report.total_savings_percent > 0.0);
}

#[tokio::test]
async fn test_malformed_json_kept_with_warning() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(input.path(), &[("broken.json", b"{bad")]);

    let report = configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();

    assert_eq!(std::fs::read(output.path().join("broken.json")).unwrap(), b"{bad");
    assert_eq!(report.files_processed, 1);
    assert_eq!(report.files_optimized, 0);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("broken.json: "));
}

#[tokio::test]
async fn test_warning_sink_receives_each_warning_once() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(
        input.path(),
        &[("a.json", b"{bad"), ("b.svg", b"<svg><g></svg>"), ("ok.json", b"{ }")],
    );

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let config = Config::default().with_warning_sink(move |message| {
        sink.lock().unwrap().push(message.to_string());
    });

    let report = configure(path_str(input.path()), path_str(output.path()), config)
        .await
        .unwrap();

    let mut received = received.lock().unwrap().clone();
    received.sort();
    let mut warnings = report.warnings.clone();
    warnings.sort();
    assert_eq!(received, warnings);
    assert_eq!(warnings.len(), 2);
}

#[tokio::test]
async fn test_self_replace_rewrites_only_smaller_images() {
    let site = TempDir::new().unwrap();
    let shrink: Vec<u8> = (0..200u8).collect();
    let grow: Vec<u8> = (0..100u8).collect();
    write_tree(
        site.path(),
        &[
            ("img/shrink.png", &shrink),
            ("img/grow.png", &grow),
            ("bin/blob.bin", b"binary payload"),
        ],
    );
    let blob = site.path().join("bin/blob.bin");
    let blob_modified = std::fs::metadata(&blob).unwrap().modified().unwrap();

    let fake = FakeImageEncoder::default();
    let optimizer = AssetOptimizer::with_encoders(encoders_with_fake_images(fake.clone()));
    let report = optimizer
        .configure(path_str(site.path()), path_str(site.path()), Config::default())
        .await
        .unwrap();

    assert!(report.is_self_replace);
    assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.files_processed, 2);
    assert_eq!(report.files_optimized, 1);

    assert_eq!(std::fs::read(site.path().join("img/shrink.png")).unwrap(), &shrink[..100]);
    assert_eq!(std::fs::read(site.path().join("img/grow.png")).unwrap(), grow);
    assert_eq!(std::fs::read(&blob).unwrap(), b"binary payload");
    assert_eq!(std::fs::metadata(&blob).unwrap().modified().unwrap(), blob_modified);

    // no temporary files left behind
    assert_eq!(
        list_files(site.path()),
        vec![
            PathBuf::from("bin/blob.bin"),
            PathBuf::from("img/grow.png"),
            PathBuf::from("img/shrink.png"),
        ]
    );
}

#[tokio::test]
async fn test_output_never_larger_than_input() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(
        input.path(),
        &[
            ("a/grow.png", b"0123456789"),
            ("a/shrink.jpg", b"0123456789"),
            ("compact.json", br#"{"a":1}"#),
            ("icon.svg", b"<svg><rect/></svg>"),
        ],
    );

    let optimizer = AssetOptimizer::with_encoders(encoders_with_fake_images(FakeImageEncoder::default()));
    optimizer
        .configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();

    for relative in list_files(input.path()) {
        let before = std::fs::metadata(input.path().join(&relative)).unwrap().len();
        let after = std::fs::metadata(output.path().join(&relative)).unwrap().len();
        assert!(after <= before, "{} grew", relative.display());
    }
}

#[tokio::test]
async fn test_second_run_removes_stale_outputs() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(
        input.path(),
        &[("keep.json", b"{ }"), ("gone/old.svg", b"<svg></svg>"), ("gone.txt", b"x")],
    );

    configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();
    assert_eq!(list_files(output.path()).len(), 3);

    std::fs::remove_dir_all(input.path().join("gone")).unwrap();
    std::fs::remove_file(input.path().join("gone.txt")).unwrap();

    let report = configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();

    assert_eq!(report.files_scanned, 1);
    assert_eq!(list_files(output.path()), vec![PathBuf::from("keep.json")]);
    assert!(!output.path().join("gone").exists());
}

#[tokio::test]
async fn test_foreign_files_in_output_survive() {
    let site = TempDir::new().unwrap();
    write_tree(
        site.path(),
        &[
            ("README.md", b"# site"),
            ("Cargo.toml", b"[package]"),
            ("src/app.json", b"{ }"),
            ("src/old.json", b"[ ]"),
        ],
    );
    let input = site.path().join("src");

    configure(path_str(&input), path_str(site.path()), Config::default())
        .await
        .unwrap();
    std::fs::remove_file(input.join("old.json")).unwrap();
    let report = configure(path_str(&input), path_str(site.path()), Config::default())
        .await
        .unwrap();

    assert_eq!(report.files_scanned, 1);
    assert_eq!(std::fs::read(site.path().join("README.md")).unwrap(), b"# site");
    assert_eq!(std::fs::read(site.path().join("Cargo.toml")).unwrap(), b"[package]");
    assert_eq!(std::fs::read(site.path().join("app.json")).unwrap(), b"{}");
    assert!(!site.path().join("old.json").exists());
    assert_eq!(std::fs::read(input.join("app.json")).unwrap(), b"{ }");
}

#[tokio::test]
async fn test_first_run_keeps_unknown_output_files() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(input.path(), &[("a.json", b"{ }")]);
    write_tree(output.path(), &[("CNAME", b"example.org"), ("a.json", b"stale")]);

    configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();

    assert_eq!(
        list_files(output.path()),
        vec![PathBuf::from("CNAME"), PathBuf::from("a.json")]
    );
    assert_eq!(std::fs::read(output.path().join("a.json")).unwrap(), b"{}");
    assert!(output.path().join(MANIFEST_NAME).is_file());
}

#[cfg(unix)]
#[tokio::test]
async fn test_directory_link_cycle_scanned_once() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(input.path(), &[("a.json", b"{ }")]);
    std::os::unix::fs::symlink(".", input.path().join("loop")).unwrap();

    let report = configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();

    assert_eq!(report.files_scanned, 1);
    assert_eq!(list_files(output.path()), vec![PathBuf::from("a.json")]);
}

#[tokio::test]
async fn test_encoding_bounded_by_workers() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let files: Vec<(String, &[u8])> = (0..8)
        .flat_map(|i| {
            [
                (format!("img/{}.png", i), b"pixels".as_slice()),
                (format!("clips/{}.mp4", i), b"frames".as_slice()),
            ]
        })
        .collect();
    let files: Vec<(&str, &[u8])> = files.iter().map(|(name, data)| (name.as_str(), *data)).collect();
    write_tree(input.path(), &files);

    let images = OverlapCounter::default();
    let videos = OverlapCounter::default();
    let optimizer = AssetOptimizer::with_encoders(Encoders::new(
        Box::new(images.clone()),
        Box::new(VectorProcessor::new()),
        Box::new(DataProcessor::new()),
        Box::new(videos.clone()),
    ));
    let config = Config {
        workers: 2,
        ..Default::default()
    };

    let report = optimizer
        .configure(path_str(input.path()), path_str(output.path()), config)
        .await
        .unwrap();

    assert_eq!(report.files_processed, 16);
    assert!(images.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(videos.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_ffmpeg_warns_once_per_video() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(input.path(), &[("intro.mp4", b"frames"), ("loop.webm", b"frames")]);

    let optimizer = AssetOptimizer::with_encoders(Encoders::new(
        Box::new(ImageProcessor::new()),
        Box::new(VectorProcessor::new()),
        Box::new(DataProcessor::new()),
        Box::new(VideoProcessor::with_tool("asset-optimizer-missing-ffmpeg")),
    ));
    let report = optimizer
        .configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();

    let mut warnings = report.warnings.clone();
    warnings.sort();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].starts_with("intro.mp4: video transcoding unavailable"));
    assert!(warnings[1].starts_with("loop.webm: video transcoding unavailable"));
    assert_eq!(report.files_optimized, 0);
    assert_eq!(std::fs::read(output.path().join("intro.mp4")).unwrap(), b"frames");
}

#[tokio::test]
async fn test_same_directory_spelled_twice_is_self_replace() {
    let site = TempDir::new().unwrap();
    write_tree(site.path(), &[("data/a.json", b"{ }")]);
    let alias = site.path().join("data").join("..").join(".");

    let report = configure(path_str(site.path()), path_str(&alias), Config::default())
        .await
        .unwrap();

    assert!(report.is_self_replace);
    assert_eq!(report.files_optimized, 1);
    assert_eq!(std::fs::read(site.path().join("data/a.json")).unwrap(), b"{}");
    assert!(!site.path().join(MANIFEST_NAME).exists());
    assert_eq!(list_files(site.path()), vec![PathBuf::from("data/a.json")]);
}

#[tokio::test]
async fn test_output_nested_in_input_is_not_rescanned() {
    let input = TempDir::new().unwrap();
    write_tree(input.path(), &[("data.json", b"{ \"a\" : 1 }")]);
    let output = input.path().join("dist");

    for _ in 0..2 {
        let report = configure(path_str(input.path()), path_str(&output), Config::default())
            .await
            .unwrap();
        assert_eq!(report.files_scanned, 1);
    }
    assert_eq!(list_files(&output), vec![PathBuf::from("data.json")]);
}

#[tokio::test]
async fn test_repeated_runs_are_isolated() {
    let first_input = TempDir::new().unwrap();
    let second_input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_tree(first_input.path(), &[("a.json", b"{bad"), ("b.json", b"{ }")]);
    write_tree(second_input.path(), &[("c.json", b"[ 1, 2 ]")]);

    let first_out = output.path().join("first");
    let second_out = output.path().join("second");
    let (first, second) = tokio::join!(
        configure(path_str(first_input.path()), path_str(&first_out), Config::default()),
        configure(path_str(second_input.path()), path_str(&second_out), Config::default()),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.files_scanned, 2);
    assert_eq!(first.warnings.len(), 1);
    assert_eq!(second.files_scanned, 1);
    assert!(second.warnings.is_empty());
    assert_eq!(second.total_original_size, 8);

    let again = configure(path_str(second_input.path()), path_str(&second_out), Config::default())
        .await
        .unwrap();
    assert_eq!(again.files_scanned, 1);
    assert_eq!(again.total_original_size, 8);
}

#[tokio::test]
async fn test_empty_input_reports_zero_percent() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let report = configure(path_str(input.path()), path_str(output.path()), Config::default())
        .await
        .unwrap();

    assert_eq!(report.total_original_size, 0);
    assert_eq!(report.total_savings_percent, 0.0);
    assert_eq!(report.summary.files, "Optimized 0 of 0 processed files (0 scanned)");
}

#[tokio::test]
async fn test_fatal_argument_errors() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("file.json");
    std::fs::write(&file, b"{}").unwrap();

    let cases = [
        ("", "out"),
        (path_str(temp.path()), ""),
        (path_str(&file), "out"),
    ];
    for (input, output) in cases {
        let err = configure(input, output, Config::default()).await.unwrap_err();
        assert!(err.downcast_ref::<OptimizeError>().is_some(), "{}", err);
    }

    let missing = temp.path().join("missing");
    let err = configure(path_str(&missing), "out", Config::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<OptimizeError>(),
        Some(OptimizeError::InputNotFound(_))
    ));
}
