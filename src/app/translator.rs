//! Translation with bounded retry.
//!
//! Every call ends in a [`TranslationOutcome`]: either the provider's text or
//! the original text together with the reason no translation was produced.
//! Provider failures never escape this module.

use crate::app::ports::TranslationProviderPort;
use crate::config::TranslationConfig;
use crate::error::ScraperError;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Empty or whitespace-only input
    Blank,
    /// Input shorter than the minimum review length
    TooShort { length: usize, minimum: usize },
    /// Every attempt failed
    Exhausted { attempts: u32, last_error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Success(String),
    Fallback {
        original: String,
        reason: FallbackReason,
    },
}

impl TranslationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranslationOutcome::Success(_))
    }

    pub fn text(&self) -> &str {
        match self {
            TranslationOutcome::Success(text) => text,
            TranslationOutcome::Fallback { original, .. } => original,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_attempts: config.retries,
            timeout: config.timeout(),
            backoff: config.backoff(),
        }
    }

    /// At least one attempt is always made
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Stateless translator around a shared provider handle; safe to call concurrently
#[derive(Clone)]
pub struct Translator {
    provider: Arc<dyn TranslationProviderPort>,
    policy: RetryPolicy,
    min_length: usize,
}

impl Translator {
    pub fn new(provider: Arc<dyn TranslationProviderPort>, policy: RetryPolicy, min_length: usize) -> Self {
        Self {
            provider,
            policy,
            min_length,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> TranslationOutcome {
        if text.trim().is_empty() {
            return fallback(text, FallbackReason::Blank);
        }
        let length = text.chars().count();
        if length < self.min_length {
            return fallback(
                text,
                FallbackReason::TooShort {
                    length,
                    minimum: self.min_length,
                },
            );
        }

        let attempts = self.policy.attempts();
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            let call = self.provider.translate(text, source_language, target_language);
            match tokio::time::timeout(self.policy.timeout, call).await {
                Ok(Ok(translated)) => {
                    debug!(provider = self.provider_name(), attempt, "translation succeeded");
                    counter!("reviews_translation_success_total").increment(1);
                    return TranslationOutcome::Success(translated);
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = ScraperError::TranslationTimeout(self.policy.timeout).to_string(),
            }

            if attempt < attempts {
                warn!(
                    provider = self.provider_name(),
                    "Translation attempt {}/{} failed: {}", attempt, attempts, last_error
                );
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        warn!(
            provider = self.provider_name(),
            "Translation failed after {} attempts: {}", attempts, last_error
        );
        counter!("reviews_translation_fallback_total").increment(1);
        fallback(
            text,
            FallbackReason::Exhausted {
                attempts,
                last_error,
            },
        )
    }
}

fn fallback(text: &str, reason: FallbackReason) -> TranslationOutcome {
    TranslationOutcome::Fallback {
        original: text.to_string(),
        reason,
    }
}
