use crate::error::{Result, ScraperError};
use crate::storage::ReviewSink;
use crate::types::NormalizedReview;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes each destination as a pretty-printed JSON array under `directory`.
///
/// The destination's extension is replaced with `.json`.
pub struct JsonFileSink {
    directory: PathBuf,
}

impl JsonFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn persist(&self, records: &[NormalizedReview], path: &Path) -> Result<()> {
        fs::create_dir_all(&self.directory)?;
        let json_content = serde_json::to_string_pretty(records)?;
        fs::write(path, json_content)?;
        Ok(())
    }
}

#[async_trait]
impl ReviewSink for JsonFileSink {
    async fn write(&self, records: &[NormalizedReview], destination: &str) -> Result<String> {
        let path = self.directory.join(destination).with_extension("json");
        let shown = path.display().to_string();
        self.persist(records, &path)
            .map_err(|e| ScraperError::sink_write(&shown, e.to_string()))?;
        info!("💾 Saved {} reviews to {}", records.len(), shown);
        Ok(shown)
    }
}
