//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Categorie di errori:
//! - **Fatali** (interrompono il run): argomenti mancanti, input inesistente
//!   o non directory, combinazioni di flag invalide, terminale non interattivo
//! - **Encoder** (mai fatali): vengono convertiti in warning dall'adapter che
//!   li produce e il file originale viene mantenuto
//!
//! ## Esempio:
//! ```ignore
//! if input.as_os_str().is_empty() {
//!     return Err(OptimizeError::MissingArgument("input").into());
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for asset optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed SVG: {0}")]
    MalformedSvg(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Missing required {0} path")]
    MissingArgument(&'static str),

    #[error("Input directory does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid arguments: {0}")]
    Usage(String),

    #[error("Refusing to replace files in place without confirmation: stdin is not a terminal (pass --yes to skip the prompt)")]
    NonInteractive,
}
