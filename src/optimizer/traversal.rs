//! # Traversal Engine
//!
//! Due passaggi ricorsivi sull'albero di input:
//! - `collect()`: registra i path relativi di tutti i file (solo listing)
//! - `process()`: invia ogni file al [`TaskOptimizer`]
//!
//! I figli di ogni directory vengono elaborati in concorrenza con
//! `join_all`; la ricorsione usa future boxate. Se la directory di output
//! si trova dentro l'input non viene mai attraversata.
//!
//! I link simbolici a directory non vengono seguiti, così un link che punta
//! a un antenato non genera cicli e i due passaggi vedono gli stessi path.
//! I link a file sono trattati come file normali.

use crate::encoder::Encoders;
use crate::optimizer::context::OptimizationContext;
use crate::optimizer::task_optimizer::TaskOptimizer;
use anyhow::{Context, Result};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

struct DirEntry {
    path: PathBuf,
    is_dir: bool,
}

/// Lists `dir` completely before any child is visited, leaving out `skip`
async fn list_dir(dir: &Path, skip: Option<&Path>) -> Result<Vec<DirEntry>> {
    let mut reader = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut entries = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry.path();
        if skip == Some(path.as_path()) {
            debug!("Skipping nested root: {}", path.display());
            continue;
        }

        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("Failed to inspect {}", path.display()))?;
        if file_type.is_symlink() && fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            debug!("Not following directory link: {}", path.display());
            continue;
        }

        entries.push(DirEntry {
            path,
            is_dir: file_type.is_dir(),
        });
    }
    Ok(entries)
}

fn relative_path(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Pass 1: records every file under the input root
pub async fn collect(ctx: &OptimizationContext) -> Result<()> {
    collect_dir(ctx, ctx.input_dir.clone()).await
}

fn collect_dir(ctx: &OptimizationContext, dir: PathBuf) -> BoxFuture<'_, Result<()>> {
    async move {
        let entries = list_dir(&dir, ctx.nested_output_root()).await?;

        let visits = entries.into_iter().map(move |entry| async move {
            if entry.is_dir {
                collect_dir(ctx, entry.path).await
            } else {
                ctx.record_scanned(relative_path(&ctx.input_dir, &entry.path));
                Ok(())
            }
        });

        join_all(visits).await.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }
    .boxed()
}

/// Pass 2: optimizes every file under the input root
pub async fn process(ctx: &OptimizationContext, encoders: &Encoders) -> Result<()> {
    let worker = TaskOptimizer::new(ctx, encoders);
    process_dir(ctx, &worker, ctx.input_dir.clone()).await
}

fn process_dir<'a>(
    ctx: &'a OptimizationContext,
    worker: &'a TaskOptimizer<'a>,
    dir: PathBuf,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let entries = list_dir(&dir, ctx.nested_output_root()).await?;

        let visits = entries.into_iter().map(move |entry| async move {
            if entry.is_dir {
                process_dir(ctx, worker, entry.path).await
            } else {
                let relative = relative_path(&ctx.input_dir, &entry.path);
                worker.process_file(&entry.path, &relative).await;
                Ok(())
            }
        });

        join_all(visits).await.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }
    .boxed()
}
