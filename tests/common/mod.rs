// Shared helpers for pipeline tests
#![allow(dead_code)]

use asset_optimizer::data_processor::DataProcessor;
use asset_optimizer::optimizer::MANIFEST_NAME;
use asset_optimizer::vector_processor::VectorProcessor;
use asset_optimizer::video_processor::VideoProcessor;
use asset_optimizer::{Asset, AssetEncoder, Encoders, WarningReporter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

/// Write `files` (relative path, content) under `root`, creating parents
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (relative, content) in files {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

/// Sorted relative paths of every file under `root`, run manifest excluded
pub fn list_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name() != MANIFEST_NAME)
        .map(|entry| entry.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

pub fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Image encoder stand-in: halves files whose name starts with `shrink`,
/// pads every other file.
#[derive(Clone, Default)]
pub struct FakeImageEncoder {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AssetEncoder for FakeImageEncoder {
    fn name(&self) -> &'static str {
        "fake-image"
    }

    async fn encode(&self, asset: &Asset, _quality: u8, _warnings: &dyn WarningReporter) -> Vec<u8> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if asset.filename.starts_with("shrink") {
            asset.data[..asset.data.len() / 2].to_vec()
        } else {
            let mut padded = asset.data.clone();
            padded.extend_from_slice(b"padding");
            padded
        }
    }
}

pub fn encoders_with_fake_images(fake: FakeImageEncoder) -> Encoders {
    Encoders::new(
        Box::new(fake),
        Box::new(VectorProcessor::new()),
        Box::new(DataProcessor::new()),
        Box::new(VideoProcessor::new()),
    )
}

/// Image encoder stand-in that records how many encodes overlap
#[derive(Clone, Default)]
pub struct OverlapCounter {
    in_flight: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

#[async_trait]
impl AssetEncoder for OverlapCounter {
    fn name(&self) -> &'static str {
        "overlap-counter"
    }

    async fn encode(&self, asset: &Asset, _quality: u8, _warnings: &dyn WarningReporter) -> Vec<u8> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        asset.data.clone()
    }
}
