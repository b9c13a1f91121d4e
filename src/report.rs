//! # Report Module
//!
//! Risultato immutabile di un run di ottimizzazione, costruito consumando
//! il contesto alla fine del secondo passaggio.
//!
//! ## Contenuto:
//! - Path di input/output così come passati e risolti
//! - Totali in byte, risparmio assoluto e percentuale
//! - Contatori: file scansionati, processati, ottimizzati
//! - Warning de-duplicati in ordine di inserimento
//! - `summary`: tre righe pronte per la stampa

use crate::file_manager::FileManager;
use serde::Serialize;
use std::path::PathBuf;

/// Human-readable summary lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub totals: String,
    pub files: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub input: String,
    pub output: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub is_self_replace: bool,
    pub total_original_size: u64,
    pub total_optimized_size: u64,
    pub total_savings: u64,
    pub total_savings_percent: f64,
    pub files_scanned: usize,
    pub files_processed: usize,
    pub files_optimized: usize,
    pub warnings: Vec<String>,
    pub summary: Summary,
}

/// Raw numbers collected during a run
#[derive(Debug, Clone, Default)]
pub struct RunTotals {
    pub original_size: u64,
    pub optimized_size: u64,
    pub scanned: usize,
    pub processed: usize,
    pub optimized: usize,
}

impl OptimizationReport {
    pub fn build(
        input: &str,
        output: &str,
        input_dir: PathBuf,
        output_dir: PathBuf,
        is_self_replace: bool,
        totals: RunTotals,
        warnings: Vec<String>,
    ) -> Self {
        let total_savings = totals.original_size.saturating_sub(totals.optimized_size);
        let total_savings_percent =
            FileManager::calculate_reduction(totals.original_size, totals.optimized_size);

        let summary = Summary {
            totals: format!(
                "Total size: {} -> {} (saved {}, {:.1}%)",
                FileManager::format_size(totals.original_size),
                FileManager::format_size(totals.optimized_size),
                FileManager::format_size(total_savings),
                total_savings_percent
            ),
            files: format!(
                "Optimized {} of {} processed files ({} scanned)",
                totals.optimized, totals.processed, totals.scanned
            ),
            destination: if is_self_replace {
                format!("Source: {} (replaced in place)", input_dir.display())
            } else {
                format!(
                    "Source: {} -> Destination: {}",
                    input_dir.display(),
                    output_dir.display()
                )
            },
        };

        Self {
            input: input.to_string(),
            output: output.to_string(),
            input_dir,
            output_dir,
            is_self_replace,
            total_original_size: totals.original_size,
            total_optimized_size: totals.optimized_size,
            total_savings,
            total_savings_percent,
            files_scanned: totals.scanned,
            files_processed: totals.processed,
            files_optimized: totals.optimized,
            warnings,
            summary,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
