use crate::error::{Result, ScraperError};
use crate::types::NormalizedReview;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Durable destination for normalized reviews.
///
/// Callers never pass an empty slice. `destination` is a file name or table name
/// interpreted by the implementation; the returned string is where the records
/// actually landed.
#[async_trait]
pub trait ReviewSink: Send + Sync {
    async fn write(&self, records: &[NormalizedReview], destination: &str) -> Result<String>;
}

/// In-memory sink for development/testing
#[derive(Clone, Default)]
pub struct InMemorySink {
    written: Arc<Mutex<BTreeMap<String, Vec<NormalizedReview>>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `destination` fail
    pub fn fail_on(&self, destination: &str) {
        self.lock_failing().push(destination.to_string());
    }

    /// Records written to `destination`, if any
    pub fn records(&self, destination: &str) -> Option<Vec<NormalizedReview>> {
        self.lock_written().get(destination).cloned()
    }

    pub fn destinations(&self) -> Vec<String> {
        self.lock_written().keys().cloned().collect()
    }

    fn lock_written(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<NormalizedReview>>> {
        self.written.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_failing(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.failing.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReviewSink for InMemorySink {
    async fn write(&self, records: &[NormalizedReview], destination: &str) -> Result<String> {
        if self.lock_failing().iter().any(|d| d == destination) {
            return Err(ScraperError::sink_write(destination, "configured to fail"));
        }
        self.lock_written()
            .entry(destination.to_string())
            .or_default()
            .extend_from_slice(records);
        debug!("Stored {} reviews under {}", records.len(), destination);
        Ok(destination.to_string())
    }
}
