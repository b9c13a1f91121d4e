//! # Encoder adapters
//!
//! Every asset category is optimized by an [`AssetEncoder`]. Adapters take the
//! original bytes and return a candidate buffer. They never fail the run: when
//! something goes wrong they report a warning through the [`WarningReporter`]
//! and hand back the original bytes, which the size gate then rejects as "no
//! improvement".

use crate::asset::Asset;
use crate::data_processor::DataProcessor;
use crate::format::Category;
use crate::image_processor::ImageProcessor;
use crate::vector_processor::VectorProcessor;
use crate::video_processor::VideoProcessor;
use async_trait::async_trait;

/// Sink for non-fatal, per-file problems.
pub trait WarningReporter: Send + Sync {
    fn report(&self, message: String);
}

#[async_trait]
pub trait AssetEncoder: Send + Sync {
    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Produce candidate bytes for `asset`. Must return `asset.data` unchanged on failure.
    async fn encode(&self, asset: &Asset, quality: u8, warnings: &dyn WarningReporter) -> Vec<u8>;
}

/// One adapter per category.
pub struct Encoders {
    image: Box<dyn AssetEncoder>,
    vector: Box<dyn AssetEncoder>,
    data: Box<dyn AssetEncoder>,
    video: Box<dyn AssetEncoder>,
}

impl Encoders {
    pub fn new(
        image: Box<dyn AssetEncoder>,
        vector: Box<dyn AssetEncoder>,
        data: Box<dyn AssetEncoder>,
        video: Box<dyn AssetEncoder>,
    ) -> Self {
        Self { image, vector, data, video }
    }

    pub fn for_category(&self, category: Category) -> &dyn AssetEncoder {
        match category {
            Category::Image => self.image.as_ref(),
            Category::Vector => self.vector.as_ref(),
            Category::Data => self.data.as_ref(),
            Category::Video => self.video.as_ref(),
        }
    }
}

impl Default for Encoders {
    fn default() -> Self {
        Self::new(
            Box::new(ImageProcessor::new()),
            Box::new(VectorProcessor::new()),
            Box::new(DataProcessor::new()),
            Box::new(VideoProcessor::new()),
        )
    }
}

/// Collects warnings in memory for driving adapters directly in tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CollectedWarnings {
    messages: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl CollectedWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[cfg(test)]
impl WarningReporter for CollectedWarnings {
    fn report(&self, message: String) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
    }
}
