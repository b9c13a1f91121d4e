//! In-memory unit of work: one file's bytes plus where it came from.

use crate::format::FormatDescriptor;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Asset {
    pub filename: String,
    pub data: Vec<u8>,
    /// Path relative to the input root
    pub relative_path: PathBuf,
    pub descriptor: &'static FormatDescriptor,
}

impl Asset {
    pub fn new(relative_path: PathBuf, data: Vec<u8>, descriptor: &'static FormatDescriptor) -> Self {
        let filename = relative_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            filename,
            data,
            relative_path,
            descriptor,
        }
    }

    /// New asset carrying `data` for the same logical file.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            filename: self.filename.clone(),
            data,
            relative_path: self.relative_path.clone(),
            descriptor: self.descriptor,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn path(&self) -> &Path {
        &self.relative_path
    }
}
