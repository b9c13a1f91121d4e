//! # Platform-specific utilities
//!
//! Centralizza la risoluzione dei tool esterni usati dagli encoder
//! (`cwebp`, `magick`, `ffmpeg`): nome dell'eseguibile per piattaforma,
//! override tramite `TOOLS_DIR` e verifica di disponibilità con cache.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing::debug;

/// Tools the encoders know how to drive
pub const KNOWN_TOOLS: &[&str] = &["cwebp", "magick", "ffmpeg"];

/// Platform-specific command manager
pub struct PlatformCommands {
    which_command: &'static str,
    tools_dir: Option<PathBuf>,
    availability: Mutex<HashMap<String, bool>>,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let which_command = if cfg!(windows) { "where" } else { "which" };

        let tools_dir = env::var("TOOLS_DIR")
            .ok()
            .map(PathBuf::from)
            .filter(|dir| dir.is_dir());
        if let Some(ref dir) = tools_dir {
            debug!("Using tools directory from TOOLS_DIR: {}", dir.display());
        }

        Self {
            which_command,
            tools_dir,
            availability: Mutex::new(HashMap::new()),
        }
    }

    /// Platform-specific executable name
    pub fn executable_name(base_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", base_name)
        } else {
            base_name.to_string()
        }
    }

    /// Path (or bare name for PATH lookup) to spawn for a tool
    pub fn get_command(&self, base_name: &str) -> PathBuf {
        let executable = Self::executable_name(base_name);
        if let Some(ref dir) = self.tools_dir {
            let bundled = dir.join(&executable);
            if bundled.is_file() {
                return bundled;
            }
        }
        PathBuf::from(executable)
    }

    /// Get the command used to check if a program exists
    pub fn which_command(&self) -> &str {
        self.which_command
    }

    /// Check if a command is available, either in `TOOLS_DIR` or on PATH
    pub async fn is_command_available(&self, base_name: &str) -> bool {
        if let Some(&cached) = self.cache().get(base_name) {
            return cached;
        }

        let command = self.get_command(base_name);
        let available = if command.is_absolute() {
            true
        } else {
            match tokio::process::Command::new(self.which_command)
                .arg(&command)
                .output()
                .await
            {
                Ok(output) => output.status.success(),
                Err(_) => false,
            }
        };

        debug!("Tool {} available: {}", base_name, available);
        self.cache().insert(base_name.to_string(), available);
        available
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, bool>> {
        self.availability
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Builds an owned argument list from mixed string-like items.
pub fn command_args<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}
