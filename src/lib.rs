//! # Asset Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `format`: Registro dei formati supportati e classificazione
//! - `asset`: Unità di lavoro in memoria (byte + path relativo)
//! - `encoder`: Contratto degli adapter e dispatch per categoria
//! - `image_processor`: PNG/JPEG in-process, WebP/AVIF tramite tool esterni
//! - `vector_processor`: Minificazione SVG
//! - `data_processor`: Minificazione JSON, GeoJSON, webmanifest
//! - `video_processor`: Transcodifica MP4/WebM con FFmpeg
//! - `optimizer`: Orchestratore, contesto per-run e attraversamento
//! - `report`: Risultato finale serializzabile
//! - `config`, `error`, `platform`, `file_manager`, `progress`: supporto
//!
//! ## Utilizzo:
//! ```ignore
//! use asset_optimizer::Config;
//!
//! let report = asset_optimizer::configure("public", "dist", Config::default()).await?;
//! println!("{}", report.summary.totals);
//! ```

pub mod asset;
pub mod config;
pub mod data_processor;
pub mod encoder;
pub mod error;
pub mod file_manager;
pub mod format;
pub mod image_processor;
pub mod optimizer;
pub mod platform;
pub mod progress;
pub mod report;
pub mod vector_processor;
pub mod video_processor;

pub use asset::Asset;
pub use config::Config;
pub use encoder::{AssetEncoder, Encoders, WarningReporter};
pub use error::OptimizeError;
pub use format::{Category, FormatDescriptor, FormatRegistry};
pub use optimizer::{configure, AssetOptimizer};
pub use report::{OptimizationReport, Summary};
