//! # File Management Module
//!
//! Questo modulo raccoglie le operazioni sui file usate dalla pipeline.
//!
//! ## Operazioni sui file:
//! - `write_file()`: Scrive un buffer creando le directory parent
//! - `replace_file()`: Sostituzione in-place tramite file temporaneo + rename
//! - `copy_file()`: Copia byte-per-byte (pass-through)
//! - `remove_quietly()`: Cancellazione idempotente, errori ignorati
//!
//! ## Utilità:
//! - `format_size()`: Converte bytes in formato leggibile (B, KB, MB, GB)
//! - `calculate_reduction()`: Calcola percentuale di riduzione

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Groups file operations used by the pipeline
pub struct FileManager;

impl FileManager {
    /// Create the parent directories of `path` if needed
    pub async fn ensure_parent_dirs(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create parent directories for {}", path.display()))?;
        }
        Ok(())
    }

    /// Write `data` to `path`, creating parent directories
    pub async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
        Self::ensure_parent_dirs(path).await?;
        fs::write(path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Replace an existing file: the new content goes to a sibling temporary
    /// file first, then is renamed over the original.
    pub async fn replace_file(path: &Path, data: &[u8]) -> Result<()> {
        let temp_path = Self::sibling_temp_path(path);
        fs::write(&temp_path, data)
            .await
            .with_context(|| format!("Failed to write temporary file {}", temp_path.display()))?;

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
        }
        Ok(())
    }

    fn sibling_temp_path(path: &Path) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(path.file_name().unwrap_or_default());
        name.push(".optimizing");
        path.with_file_name(name)
    }

    /// Byte-for-byte copy, creating parent directories
    pub async fn copy_file(from: &Path, to: &Path) -> Result<u64> {
        Self::ensure_parent_dirs(to).await?;
        fs::copy(from, to)
            .await
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))
    }

    /// Delete a file, ignoring every failure (including "not found")
    pub async fn remove_quietly(path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            debug!("Cleanup skipped for {}: {}", path.display(), e);
        }
    }

    /// Human-readable size: `0 B`, `512.0 B`, `1.5 KB`, ... up to GB
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
        if size == 0 {
            return "0 B".to_string();
        }

        let mut value = size as f64;
        let mut unit_index = 0;
        while value >= 1024.0 && unit_index < UNITS.len() - 1 {
            value /= 1024.0;
            unit_index += 1;
        }

        format!("{:.1} {}", value, UNITS[unit_index])
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
