//! # Optimizer Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `asset_optimizer`: Orchestratore principale (`configure`)
//! - `context`: Stato per-invocazione condiviso dai task
//! - `traversal`: Attraversamento in due passaggi dell'albero di input
//! - `manifest`: Elenco dei file scritti dall'ultimo run
//! - `task_optimizer`: Worker per singoli file
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod asset_optimizer;
pub mod context;
pub mod manifest;
pub mod path_resolver;
pub mod task_optimizer;
pub mod traversal;

pub use asset_optimizer::{configure, AssetOptimizer};
pub use context::OptimizationContext;
pub use manifest::{RunManifest, MANIFEST_NAME};
pub use path_resolver::PathResolver;
pub use task_optimizer::TaskOptimizer;
