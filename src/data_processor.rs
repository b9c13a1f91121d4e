//! Structured data minification (JSON family).
//!
//! The document is parsed into a `serde_json::Value` (key order and number
//! literals preserved) and written back without any insignificant whitespace.

use crate::asset::Asset;
use crate::encoder::{AssetEncoder, WarningReporter};
use crate::error::OptimizeError;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct DataProcessor;

impl DataProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Re-serialize a JSON document compactly.
    pub fn minify(data: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        let value: serde_json::Value = serde_json::from_slice(data)?;
        Ok(serde_json::to_vec(&value)?)
    }
}

#[async_trait]
impl AssetEncoder for DataProcessor {
    fn name(&self) -> &'static str {
        "data"
    }

    async fn encode(&self, asset: &Asset, _quality: u8, warnings: &dyn WarningReporter) -> Vec<u8> {
        match Self::minify(&asset.data) {
            Ok(minified) => {
                debug!(
                    "Minified {}: {} -> {} bytes",
                    asset.relative_path.display(),
                    asset.data.len(),
                    minified.len()
                );
                minified
            }
            Err(e) => {
                warnings.report(format!(
                    "{}: failed to minify {} data: {}",
                    asset.relative_path.display(),
                    asset.descriptor.extension,
                    e
                ));
                asset.data.clone()
            }
        }
    }
}
