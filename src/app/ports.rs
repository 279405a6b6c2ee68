use crate::error::Result;
use crate::types::{AppDetails, FetchRequest, RawReview};
use async_trait::async_trait;

/// Review source boundary.
///
/// Returns whatever the store hands back for one (app, language) query, possibly
/// nothing. Implementations must not fill in `language`, `app_id` or
/// `scrape_timestamp`; the orchestrator does that. Only unrecoverable transport
/// failures are errors.
#[async_trait]
pub trait ReviewSourcePort: Send + Sync {
    fn source_name(&self) -> &str;

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<RawReview>>;
}

/// Listing metadata lookup; purely informational, callers only warn on failure
#[async_trait]
pub trait AppDetailsPort: Send + Sync {
    async fn details(&self, app_id: &str, language: &str, country: &str) -> Result<AppDetails>;
}

/// A single translation attempt against an external service
#[async_trait]
pub trait TranslationProviderPort: Send + Sync {
    fn provider_name(&self) -> &str;

    /// `source_language` is `None` when the provider should detect it
    async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String>;
}

/// Pacing between consecutive source queries
#[async_trait]
pub trait PacingPort: Send + Sync {
    /// Wait until the next query may start
    async fn acquire(&self);
}
