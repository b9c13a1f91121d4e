//! # Task Optimizer Module
//!
//! Worker per l'ottimizzazione di singoli file.
//! Separato dal motore di attraversamento per maggiore modularità.
//!
//! ## Flusso per file:
//! 0. Attesa di uno slot del contesto (limite `workers`, un video alla volta)
//! 1. Classificazione per estensione (sconosciuta → pass-through)
//! 2. Lettura completa del file
//! 3. Dispatch all'adapter della categoria
//! 4. Size gate: il candidato vince solo se strettamente più piccolo
//! 5. Scrittura (in self-replace solo se il candidato ha vinto)
//! 6. Aggregazione dei totali nel contesto

use crate::asset::Asset;
use crate::encoder::{Encoders, WarningReporter};
use crate::file_manager::FileManager;
use crate::format::{self, FormatDescriptor};
use crate::optimizer::context::OptimizationContext;
use crate::optimizer::path_resolver::PathResolver;
use std::path::Path;
use tracing::debug;

/// True when the candidate is strictly smaller than the original
pub fn passes_size_gate(original_size: u64, candidate_size: u64) -> bool {
    candidate_size < original_size
}

/// Worker per elaborazione singoli file
pub struct TaskOptimizer<'a> {
    ctx: &'a OptimizationContext,
    encoders: &'a Encoders,
}

impl<'a> TaskOptimizer<'a> {
    pub fn new(ctx: &'a OptimizationContext, encoders: &'a Encoders) -> Self {
        Self { ctx, encoders }
    }

    /// Processa un singolo file. Gli errori diventano warning.
    pub async fn process_file(&self, source: &Path, relative_path: &Path) {
        let descriptor = format::classify(relative_path);
        let _slot = self.ctx.encoder_slot(descriptor.map(|d| d.category)).await;

        match descriptor {
            Some(descriptor) => self.optimize(source, relative_path, descriptor).await,
            None => self.pass_through(source, relative_path).await,
        }
    }

    async fn pass_through(&self, source: &Path, relative_path: &Path) {
        if self.ctx.is_self_replace {
            debug!("Leaving unsupported file untouched: {}", relative_path.display());
            return;
        }

        let destination = PathResolver::output_path(&self.ctx.output_dir, relative_path);
        match FileManager::copy_file(source, &destination).await {
            Ok(bytes) => debug!("Copied {} ({} bytes)", relative_path.display(), bytes),
            Err(e) => self
                .ctx
                .report(format!("{}: failed to copy file: {:#}", relative_path.display(), e)),
        }
    }

    async fn optimize(&self, source: &Path, relative_path: &Path, descriptor: &'static FormatDescriptor) {
        let data = match tokio::fs::read(source).await {
            Ok(data) => data,
            Err(e) => {
                self.ctx
                    .report(format!("{}: failed to read file: {}", relative_path.display(), e));
                return;
            }
        };

        let asset = Asset::new(relative_path.to_path_buf(), data, descriptor);
        let original_size = asset.size();
        let encoder = self.encoders.for_category(descriptor.category);

        debug!(
            "Encoding {} ({} bytes) with {} adapter",
            relative_path.display(),
            original_size,
            encoder.name()
        );
        let encoded = encoder
            .encode(&asset, self.ctx.config.image_quality, self.ctx)
            .await;
        let candidate = asset.with_data(encoded);

        let improved = passes_size_gate(original_size, candidate.size());
        debug!(
            "Size gate for {}: {} -> {} ({})",
            relative_path.display(),
            original_size,
            candidate.size(),
            if improved { "accepted" } else { "kept original" }
        );
        let chosen = if improved { candidate } else { asset };

        if let Err(e) = self.write(&chosen, improved).await {
            self.ctx
                .report(format!("{}: failed to write file: {:#}", relative_path.display(), e));
            return;
        }

        self.ctx.record_processed(original_size, chosen.size());
    }

    async fn write(&self, chosen: &Asset, improved: bool) -> anyhow::Result<()> {
        if self.ctx.is_self_replace {
            if improved {
                let target = PathResolver::output_path(&self.ctx.input_dir, chosen.path());
                FileManager::replace_file(&target, &chosen.data).await?;
            }
            return Ok(());
        }

        let destination = PathResolver::output_path(&self.ctx.output_dir, chosen.path());
        FileManager::write_file(&destination, &chosen.data).await
    }
}
