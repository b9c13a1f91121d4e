//! # Asset Optimizer Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli
//! specializzati.
//!
//! ## Sequenza di un run:
//! 1. Validazione degli argomenti (input/output non vuoti, input esistente)
//! 2. Creazione del contesto (path risolti, self-replace, config normalizzata)
//! 3. Pass 1: raccolta dei path relativi
//! 4. Cleanup dell'output (saltato in self-replace): cancella le controparti
//!    dei file scansionati e i file del manifest precedente spariti dall'input
//! 5. Pass 2: ottimizzazione di ogni file
//! 6. Salvataggio del manifest e report finale

use crate::config::Config;
use crate::encoder::{Encoders, WarningReporter};
use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::optimizer::context::OptimizationContext;
use crate::optimizer::manifest::{self, RunManifest, MANIFEST_NAME};
use crate::optimizer::path_resolver::PathResolver;
use crate::optimizer::traversal;
use crate::platform::{PlatformCommands, KNOWN_TOOLS};
use crate::report::OptimizationReport;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Entry point of the pipeline; holds the encoder adapters
pub struct AssetOptimizer {
    encoders: Encoders,
}

impl Default for AssetOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetOptimizer {
    pub fn new() -> Self {
        Self::with_encoders(Encoders::default())
    }

    pub fn with_encoders(encoders: Encoders) -> Self {
        Self { encoders }
    }

    /// Runs one optimization from `input` into `output`.
    ///
    /// Every call gets its own context, so concurrent or repeated runs never
    /// share counters, scanned paths or warnings.
    pub async fn configure(&self, input: &str, output: &str, config: Config) -> Result<OptimizationReport> {
        if input.trim().is_empty() {
            return Err(OptimizeError::MissingArgument("input").into());
        }
        if output.trim().is_empty() {
            return Err(OptimizeError::MissingArgument("output").into());
        }

        let input_path = Path::new(input);
        let metadata = match tokio::fs::metadata(input_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OptimizeError::InputNotFound(input_path.to_path_buf()).into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect input {}", input));
            }
        };
        if !metadata.is_dir() {
            return Err(OptimizeError::NotADirectory(input_path.to_path_buf()).into());
        }

        let ctx = OptimizationContext::new(input_path, Path::new(output), &config)?;

        info!("Starting asset optimization");
        info!("Input: {}", ctx.input_dir.display());
        if ctx.is_self_replace {
            info!("Mode: self-replace (files rewritten in place)");
        } else {
            info!("Output: {}", ctx.output_dir.display());
        }
        info!("Image quality: {}", ctx.config.image_quality);
        if ctx.config.verbose {
            Self::log_tool_availability().await;
        }

        traversal::collect(&ctx).await?;
        debug!("Pass 1 complete: {} files scanned", ctx.scanned_files().len());

        self.cleanup(&ctx).await?;

        traversal::process(&ctx, &self.encoders).await?;
        Self::save_manifest(&ctx).await;

        let report = ctx.into_report(input, output);
        info!("{}", report.summary.totals);
        info!("{}", report.summary.files);
        Ok(report)
    }

    /// Clears outputs of scanned paths and the files an earlier run wrote
    /// for inputs that are gone. Files the optimizer never wrote are kept.
    async fn cleanup(&self, ctx: &OptimizationContext) -> Result<()> {
        if ctx.is_self_replace {
            debug!("Self-replace run, cleanup skipped");
            return Ok(());
        }

        tokio::fs::create_dir_all(&ctx.output_dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", ctx.output_dir.display()))?;

        let scanned: BTreeSet<PathBuf> = ctx.scanned_files().into_iter().collect();
        for relative in &scanned {
            FileManager::remove_quietly(&PathResolver::output_path(&ctx.output_dir, relative)).await;
        }

        let previous = RunManifest::load(&ctx.output_dir).await;
        for relative in previous.stale(&scanned) {
            let target = PathResolver::output_path(&ctx.output_dir, relative);
            if target.starts_with(&ctx.input_dir) {
                debug!("Keeping {}: inside the input tree", target.display());
                continue;
            }
            debug!("Removing stale output {}", relative.display());
            manifest::remove_with_empty_parents(&target, &ctx.output_dir).await;
        }
        Ok(())
    }

    /// Records what this run wrote, for the cleanup of the next one
    async fn save_manifest(ctx: &OptimizationContext) {
        if ctx.is_self_replace {
            return;
        }
        if ctx.is_scanned(Path::new(MANIFEST_NAME)) {
            ctx.report(format!(
                "{}: input file has the name of the run manifest, stale outputs are not tracked",
                MANIFEST_NAME
            ));
            return;
        }

        if let Err(e) = RunManifest::new(ctx.scanned_files()).save(&ctx.output_dir).await {
            ctx.report(format!("{}: {:#}", MANIFEST_NAME, e));
        }
    }

    async fn log_tool_availability() {
        let platform = PlatformCommands::instance();
        for tool in KNOWN_TOOLS {
            let available = platform.is_command_available(tool).await;
            debug!("External tool {}: {}", tool, if available { "found" } else { "missing" });
        }
    }
}

/// Runs one optimization with the default adapters
pub async fn configure(input: &str, output: &str, config: Config) -> Result<OptimizationReport> {
    AssetOptimizer::new().configure(input, output, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn downcast(err: anyhow::Error) -> OptimizeError {
        err.downcast::<OptimizeError>().unwrap()
    }

    #[tokio::test]
    async fn test_empty_arguments() {
        let err = configure("", "out", Config::default()).await.unwrap_err();
        assert!(matches!(downcast(err), OptimizeError::MissingArgument("input")));

        let err = configure("in", "  ", Config::default()).await.unwrap_err();
        assert!(matches!(downcast(err), OptimizeError::MissingArgument("output")));
    }

    #[tokio::test]
    async fn test_input_not_found() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        let err = configure(missing.to_str().unwrap(), "out", Config::default())
            .await
            .unwrap_err();
        assert!(matches!(downcast(err), OptimizeError::InputNotFound(_)));
    }

    #[tokio::test]
    async fn test_input_is_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.json");
        std::fs::write(&file, b"{}").unwrap();

        let err = configure(file.to_str().unwrap(), "out", Config::default())
            .await
            .unwrap_err();
        assert!(matches!(downcast(err), OptimizeError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_empty_input_tree() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let out_dir = output.path().join("dist");

        let report = configure(
            input.path().to_str().unwrap(),
            out_dir.to_str().unwrap(),
            Config::default(),
        )
        .await
        .unwrap();

        assert!(out_dir.is_dir());
        assert_eq!(report.files_scanned, 0);
        assert_eq!(report.total_savings_percent, 0.0);
        assert!(!report.is_self_replace);
    }
}
