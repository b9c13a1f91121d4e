//! # Run Manifest
//!
//! Elenco dei path relativi scritti nell'output dall'ultimo run, salvato in
//! JSON nella radice di output.
//!
//! Al run successivo vengono cancellati solo i file elencati nel manifest
//! precedente e non più presenti in input: i file estranei già presenti
//! nella directory di output non vengono mai toccati.
//!
//! ## Esempio:
//! ```json
//! {
//!   "files": ["data/site.json", "img/logo.png"]
//! }
//! ```

use crate::file_manager::FileManager;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of the manifest inside the output root
pub const MANIFEST_NAME: &str = ".asset-optimizer-manifest.json";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub files: BTreeSet<PathBuf>,
}

impl RunManifest {
    pub fn new(files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }

    pub fn path(output_dir: &Path) -> PathBuf {
        output_dir.join(MANIFEST_NAME)
    }

    /// Manifest of the previous run; empty when missing or unreadable
    pub async fn load(output_dir: &Path) -> Self {
        let path = Self::path(output_dir);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No previous manifest at {}: {}", path.display(), e);
                return Self::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!("Ignoring invalid manifest {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub async fn save(&self, output_dir: &Path) -> Result<()> {
        let path = Self::path(output_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize run manifest")?;
        FileManager::write_file(&path, content.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Entries of this manifest that `current` no longer lists.
    /// Entries that could escape the output root are left out.
    pub fn stale<'a>(&'a self, current: &'a BTreeSet<PathBuf>) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.files
            .iter()
            .filter(move |relative| !current.contains(*relative))
            .filter(|relative| is_plain_relative(relative))
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
        && path != Path::new(MANIFEST_NAME)
}

/// Removes `file` and then every parent left empty, up to `root`
pub async fn remove_with_empty_parents(file: &Path, root: &Path) {
    FileManager::remove_quietly(file).await;

    let mut dir = file.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) || fs::remove_dir(current).await.is_err() {
            break;
        }
        dir = current.parent();
    }
}
