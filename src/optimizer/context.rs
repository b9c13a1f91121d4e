//! # Optimization Context
//!
//! Stato di un singolo run, creato a ogni chiamata di `configure` e
//! condiviso per riferimento con tutti i task concorrenti.
//!
//! ## Contenuto:
//! - Directory di input/output risolte e flag `is_self_replace`
//! - Configurazione già normalizzata (qualità in [1, 100], almeno un worker)
//! - Semafori che limitano le codifiche concorrenti: `workers` permessi
//!   in totale, uno solo per i video
//! - Stato mutabile dietro un `std::sync::Mutex`: totali, contatori,
//!   insieme dei path scansionati e warning de-duplicati
//!
//! Il lock non viene mai tenuto attraverso un `.await`; la callback dei
//! warning viene invocata dopo averlo rilasciato.

use crate::config::Config;
use crate::encoder::WarningReporter;
use crate::format::Category;
use crate::optimizer::path_resolver::PathResolver;
use crate::report::{OptimizationReport, RunTotals};
use anyhow::Result;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct RunState {
    total_original_size: u64,
    total_optimized_size: u64,
    scanned_files: BTreeSet<PathBuf>,
    processed_files: usize,
    optimized_files: usize,
    warnings: Vec<String>,
    seen_warnings: HashSet<String>,
}

#[derive(Debug)]
pub struct OptimizationContext {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub is_self_replace: bool,
    pub config: Config,
    encode_permits: Semaphore,
    video_permits: Semaphore,
    state: Mutex<RunState>,
}

/// Held while one file is read, encoded and written
#[derive(Debug)]
pub struct EncoderSlot<'a> {
    _video: Option<SemaphorePermit<'a>>,
    _worker: Option<SemaphorePermit<'a>>,
}

impl OptimizationContext {
    pub fn new(input: &Path, output: &Path, config: &Config) -> Result<Self> {
        let input_dir = PathResolver::resolve(input)?;
        let output_dir = PathResolver::resolve(output)?;
        let is_self_replace = input_dir == output_dir;
        let config = config.resolved();

        Ok(Self {
            input_dir,
            output_dir,
            is_self_replace,
            encode_permits: Semaphore::new(config.workers),
            video_permits: Semaphore::new(1),
            config,
            state: Mutex::new(RunState::default()),
        })
    }

    /// Waits for a free worker; videos first wait for the single video slot.
    pub async fn encoder_slot(&self, category: Option<Category>) -> EncoderSlot<'_> {
        let video = match category {
            Some(Category::Video) => self.video_permits.acquire().await.ok(),
            _ => None,
        };
        EncoderSlot {
            _video: video,
            _worker: self.encode_permits.acquire().await.ok(),
        }
    }

    fn state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a file found in pass 1; returns false if it was already known
    pub fn record_scanned(&self, relative_path: PathBuf) -> bool {
        self.state().scanned_files.insert(relative_path)
    }

    /// Snapshot of the scanned set, in path order
    pub fn scanned_files(&self) -> Vec<PathBuf> {
        self.state().scanned_files.iter().cloned().collect()
    }

    pub fn is_scanned(&self, relative_path: &Path) -> bool {
        self.state().scanned_files.contains(relative_path)
    }

    /// Output root when it lies strictly inside the input tree of a disjoint run
    pub fn nested_output_root(&self) -> Option<&Path> {
        if self.is_self_replace {
            return None;
        }
        PathResolver::relative_to(&self.output_dir, &self.input_dir).map(|_| self.output_dir.as_path())
    }

    pub fn record_processed(&self, original_size: u64, chosen_size: u64) {
        let mut state = self.state();
        state.total_original_size += original_size;
        state.total_optimized_size += chosen_size;
        state.processed_files += 1;
        if chosen_size < original_size {
            state.optimized_files += 1;
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.state().warnings.clone()
    }

    pub fn into_report(self, input: &str, output: &str) -> OptimizationReport {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let totals = RunTotals {
            original_size: state.total_original_size,
            optimized_size: state.total_optimized_size,
            scanned: state.scanned_files.len(),
            processed: state.processed_files,
            optimized: state.optimized_files,
        };

        OptimizationReport::build(
            input,
            output,
            self.input_dir,
            self.output_dir,
            self.is_self_replace,
            totals,
            state.warnings,
        )
    }
}

impl WarningReporter for OptimizationContext {
    fn report(&self, message: String) {
        {
            let mut state = self.state();
            if !state.seen_warnings.insert(message.clone()) {
                debug!("Duplicate warning dropped: {}", message);
                return;
            }
            state.warnings.push(message.clone());
        }

        match self.config.on_warning {
            Some(ref sink) => sink(&message),
            None => warn!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn context(input: &str, output: &str) -> OptimizationContext {
        OptimizationContext::new(Path::new(input), Path::new(output), &Config::default()).unwrap()
    }

    #[test]
    fn test_self_replace_detection() {
        assert!(context("site", "./site").is_self_replace);
        assert!(context("/tmp/a/../b", "/tmp/b").is_self_replace);
        assert!(!context("site", "dist").is_self_replace);
    }

    #[test]
    fn test_config_is_resolved() {
        let config = Config {
            image_quality: 0,
            ..Default::default()
        };
        let ctx = OptimizationContext::new(Path::new("a"), Path::new("b"), &config).unwrap();
        assert_eq!(ctx.config.image_quality, 1);
    }

    #[test]
    fn test_scanned_files_are_unique() {
        let ctx = context("in", "out");
        assert!(ctx.record_scanned(PathBuf::from("a.json")));
        assert!(!ctx.record_scanned(PathBuf::from("a.json")));
        assert!(ctx.record_scanned(PathBuf::from("b/c.svg")));
        assert_eq!(ctx.scanned_files().len(), 2);
    }

    #[test]
    fn test_record_processed_counts_strict_improvements() {
        let ctx = context("in", "out");
        ctx.record_processed(100, 60);
        ctx.record_processed(50, 50);

        let report = ctx.into_report("in", "out");
        assert_eq!(report.total_original_size, 150);
        assert_eq!(report.total_optimized_size, 110);
        assert_eq!(report.files_processed, 2);
        assert_eq!(report.files_optimized, 1);
    }

    #[test]
    fn test_warnings_deduplicated_and_forwarded_once() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let config = Config::default().with_warning_sink(move |message| {
            sink.lock().unwrap().push(message.to_string());
        });
        let ctx = OptimizationContext::new(Path::new("in"), Path::new("out"), &config).unwrap();

        ctx.report("a.json: bad".to_string());
        ctx.report("b.svg: bad".to_string());
        ctx.report("a.json: bad".to_string());

        assert_eq!(ctx.warnings(), vec!["a.json: bad", "b.svg: bad"]);
        assert_eq!(received.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_encoder_slots_bounded_by_workers() {
        let config = Config {
            workers: 2,
            ..Default::default()
        };
        let ctx = OptimizationContext::new(Path::new("in"), Path::new("out"), &config).unwrap();

        let first = ctx.encoder_slot(Some(Category::Image)).await;
        let _second = ctx.encoder_slot(None).await;
        assert_eq!(ctx.encode_permits.available_permits(), 0);

        drop(first);
        let _video = ctx.encoder_slot(Some(Category::Video)).await;
        assert_eq!(ctx.video_permits.available_permits(), 0);
        assert_eq!(ctx.encode_permits.available_permits(), 0);
    }

    #[test]
    fn test_nested_output_root() {
        let ctx = context("/site", "/site/dist");
        assert_eq!(ctx.nested_output_root(), Some(Path::new("/site/dist")));
        assert_eq!(context("/site", "/out").nested_output_root(), None);
        assert_eq!(context("/site", "/site").nested_output_root(), None);
        assert_eq!(context("/site/src", "/site").nested_output_root(), None);
    }
}
