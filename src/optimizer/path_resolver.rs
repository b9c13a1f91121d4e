//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path.
//! I path vengono risolti in forma assoluta rispetto alla directory corrente
//! con normalizzazione lessicale di `.` e `..` (nessun accesso al filesystem,
//! quindi funziona anche per directory di output non ancora create).

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Absolute, lexically normalized form of `path`
    pub fn resolve(path: &Path) -> Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to read current directory")?
                .join(path)
        };

        let resolved = Self::normalize(&absolute);
        debug!("Resolved path: {} -> {}", path.display(), resolved.display());
        Ok(resolved)
    }

    /// Removes `.` components and folds `..` into their parent
    pub fn normalize(path: &Path) -> PathBuf {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    // `..` at the root stays at the root
                    if !normalized.pop() {
                        normalized.push(component);
                    }
                }
                other => normalized.push(other),
            }
        }
        normalized
    }

    /// Output counterpart of an input-relative path
    pub fn output_path(output_root: &Path, relative_path: &Path) -> PathBuf {
        output_root.join(relative_path)
    }

    /// Relative path of `path` under `root`, if it lies inside it
    pub fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
        path.strip_prefix(root).ok().map(Path::to_path_buf)
    }
}
