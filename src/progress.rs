//! # Progress Feedback Module
//!
//! Spinner `indicatif` mostrato dalla CLI mentre il run è in corso.
//! Il numero di file non è noto in anticipo (la scansione fa parte del run),
//! quindi si usa uno spinner indeterminato invece di una barra.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:03] Optimizing assets... (2 warnings) img/bad.png: image compression failed (PNG)
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Spinner for the in-flight run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
    base_message: Arc<str>,
    warnings: Arc<AtomicUsize>,
}

impl ProgressManager {
    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::from_bar(bar, message)
    }

    /// Spinner that draws nothing and never ticks (JSON output, tests)
    pub fn hidden() -> Self {
        Self::from_bar(ProgressBar::hidden(), "")
    }

    fn from_bar(bar: ProgressBar, message: &str) -> Self {
        bar.set_message(message.to_string());
        Self {
            bar,
            base_message: Arc::from(message),
            warnings: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shows the latest warning next to the running count
    pub fn warning(&self, message: &str) {
        let count = self.warnings.fetch_add(1, Ordering::Relaxed) + 1;
        let noun = if count == 1 { "warning" } else { "warnings" };
        self.bar
            .set_message(format!("{} ({} {}) {}", self.base_message, count, noun, message));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn message(&self) -> String {
        self.bar.message()
    }

    /// Remove the spinner before printing the results
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
