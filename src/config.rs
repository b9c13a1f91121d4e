//! # Configuration Management Module
//!
//! Questo modulo gestisce le opzioni di un run di ottimizzazione.
//!
//! ## Parametri di configurazione:
//! - `image_quality`: Qualità immagini (1-100, default: 80). Valori fuori
//!   range vengono riportati nell'intervallo, non rifiutati
//! - `workers`: Numero massimo di file codificati in parallelo (default:
//!   core disponibili, riportato in [1, 1024]). I video sono codificati uno
//!   alla volta
//! - `verbose`: Solo tracing diagnostico, nessun effetto sul comportamento
//! - `on_warning`: Callback opzionale invocata una volta per ogni warning
//!   distinto; senza callback i warning vengono loggati subito
//!
//! ## Persistenza:
//! - `from_file()` / `save_to_file()` in JSON
//! - `default_path()`: `<config_dir>/asset-optimizer/config.json`
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     image_quality: 85,
//!     ..Default::default()
//! };
//! let report = asset_optimizer::configure("assets", "dist", config).await?;
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_IMAGE_QUALITY: u8 = 80;
pub const MIN_IMAGE_QUALITY: u8 = 1;
pub const MAX_IMAGE_QUALITY: u8 = 100;
pub const FALLBACK_WORKERS: usize = 4;
pub const MAX_WORKERS: usize = 1024;

/// One worker per available core
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
}

/// Callback receiving each distinct warning message once
pub type WarningSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Options for one optimization run
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image quality (1-100)
    pub image_quality: u8,
    /// Number of files encoded concurrently
    pub workers: usize,
    /// Diagnostic tracing only
    pub verbose: bool,
    #[serde(skip)]
    pub on_warning: Option<WarningSink>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_quality: DEFAULT_IMAGE_QUALITY,
            workers: default_workers(),
            verbose: false,
            on_warning: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("image_quality", &self.image_quality)
            .field("workers", &self.workers)
            .field("verbose", &self.verbose)
            .field("on_warning", &self.on_warning.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl Config {
    /// Clamp any integer quality into [1, 100]
    pub fn clamp_quality(value: i64) -> u8 {
        value.clamp(MIN_IMAGE_QUALITY as i64, MAX_IMAGE_QUALITY as i64) as u8
    }

    /// Copy with every option brought into its valid range
    pub fn resolved(&self) -> Self {
        Self {
            image_quality: Self::clamp_quality(self.image_quality as i64),
            workers: self.workers.clamp(1, MAX_WORKERS),
            ..self.clone()
        }
    }

    pub fn with_warning_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_warning = Some(Arc::new(sink));
        self
    }

    /// Default location of the options file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("asset-optimizer").join("config.json"))
    }

    /// Load configuration from file; a missing file yields the defaults
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config.resolved())
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
