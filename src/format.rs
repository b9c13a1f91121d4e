//! # Format Registry
//!
//! Static table mapping a lowercase file extension to the asset category that
//! knows how to optimize it. Built once per process from four ordered lists
//! and only ever read afterwards.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "avif"];
pub const VECTOR_EXTENSIONS: &[&str] = &["svg"];
pub const DATA_EXTENSIONS: &[&str] = &["json", "geojson", "webmanifest"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// Broad family an asset belongs to; selects the encoder adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Vector,
    Data,
    Video,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Image => "image",
            Category::Vector => "vector",
            Category::Data => "data",
            Category::Video => "video",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub extension: &'static str,
    pub category: Category,
}

pub struct FormatRegistry {
    by_extension: HashMap<&'static str, FormatDescriptor>,
}

impl FormatRegistry {
    /// Get the process-wide registry
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<FormatRegistry> = OnceLock::new();
        INSTANCE.get_or_init(Self::build)
    }

    fn build() -> Self {
        let lists = [
            (IMAGE_EXTENSIONS, Category::Image),
            (VECTOR_EXTENSIONS, Category::Vector),
            (DATA_EXTENSIONS, Category::Data),
            (VIDEO_EXTENSIONS, Category::Video),
        ];

        let mut by_extension = HashMap::new();
        for (extensions, category) in lists {
            for &extension in extensions {
                by_extension.insert(extension, FormatDescriptor { extension, category });
            }
        }

        Self { by_extension }
    }

    /// Look up an extension (without the leading dot). Matching is case-insensitive.
    pub fn lookup(&self, extension: &str) -> Option<&FormatDescriptor> {
        if extension.is_empty() {
            return None;
        }
        self.by_extension.get(extension.to_lowercase().as_str())
    }

    pub fn is_supported(&self, extension: &str) -> bool {
        self.lookup(extension).is_some()
    }

    /// Classify a file by its extension; `None` means pass-through.
    pub fn classify(&self, path: &Path) -> Option<&FormatDescriptor> {
        let extension = path.extension()?.to_str()?;
        self.lookup(extension)
    }
}

pub fn lookup(extension: &str) -> Option<&'static FormatDescriptor> {
    FormatRegistry::instance().lookup(extension)
}

pub fn is_supported(extension: &str) -> bool {
    FormatRegistry::instance().is_supported(extension)
}

pub fn classify(path: &Path) -> Option<&'static FormatDescriptor> {
    FormatRegistry::instance().classify(path)
}
