use crate::app::translator::{TranslationOutcome, Translator};
use crate::config::Config;
use crate::constants::{MAX_RATING, MIN_RATING, REVIEW_DATE_FORMAT};
use crate::emoji;
use crate::types::{NormalizedReview, RawReview};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

/// Settings the normalizer reads from the run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerSettings {
    pub target_language: String,
    pub translation_enabled: bool,
    pub extract_emoji: bool,
    pub min_review_length: usize,
}

impl NormalizerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_language: config.target_language.clone(),
            translation_enabled: config.translation.enabled,
            extract_emoji: config.emoji.extract,
            min_review_length: config.min_review_length,
        }
    }
}

/// A review dropped for being too short. Not an error, only counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub review_id: String,
    pub length: usize,
    pub minimum: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    Accepted {
        review: NormalizedReview,
        /// Present only when translation was attempted
        translation: Option<TranslationOutcome>,
    },
    Rejected(RejectedRecord),
}

/// Normalized reviews of one batch plus what happened to the rest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub accepted: Vec<NormalizedReview>,
    pub rejected: usize,
    pub translated: usize,
    pub translation_fallbacks: usize,
}

/// Turns raw store reviews into [`NormalizedReview`] records
#[derive(Clone)]
pub struct ReviewNormalizer {
    settings: NormalizerSettings,
    translator: Option<Translator>,
}

impl ReviewNormalizer {
    pub fn new(settings: NormalizerSettings, translator: Option<Translator>) -> Self {
        Self { settings, translator }
    }

    /// Normalize a single review; only too-short reviews are rejected
    pub async fn normalize(&self, raw: &RawReview, source_app: &str) -> NormalizeOutcome {
        let text = raw.content.as_deref().unwrap_or("");
        let review_id = raw.review_id.clone().unwrap_or_default();

        let length = text.trim().chars().count();
        if length < self.settings.min_review_length {
            debug!(review_id = %review_id, length, "rejecting short review");
            return NormalizeOutcome::Rejected(RejectedRecord {
                review_id,
                length,
                minimum: self.settings.min_review_length,
            });
        }

        let emoji_info = emoji::extract(raw.content.as_deref());

        let translation = match &self.translator {
            Some(translator)
                if self.settings.translation_enabled
                    && raw.language != self.settings.target_language
                    && !text.trim().is_empty() =>
            {
                Some(
                    translator
                        .translate(text, Some(&raw.language), &self.settings.target_language)
                        .await,
                )
            }
            _ => None,
        };

        let (translated_text, is_translated) = match &translation {
            Some(outcome) => (
                outcome.text().to_string(),
                outcome.is_success() && raw.language != self.settings.target_language,
            ),
            None => (text.to_string(), false),
        };

        let (emojis, emoji_count, emoji_descriptions) = if self.settings.extract_emoji {
            (emoji_info.emojis, emoji_info.count, emoji_info.descriptions)
        } else {
            (Vec::new(), 0, Vec::new())
        };

        let review = NormalizedReview {
            review_id,
            source_app: source_app.to_string(),
            app_identifier: raw.app_id.clone(),
            review_text: text.to_string(),
            review_text_clean: emoji_info.clean_text,
            rating: clamp_rating(&raw.score),
            review_date: format_review_date(&raw.at),
            thumbs_up: parse_thumbs_up(&raw.thumbs_up_count),
            language: raw.language.clone(),
            scrape_timestamp: raw.scrape_timestamp.clone(),
            translated_text,
            is_translated,
            emojis,
            emoji_count,
            emoji_descriptions,
        };

        NormalizeOutcome::Accepted { review, translation }
    }

    /// Normalize reviews in order, dropping rejects
    pub async fn normalize_batch(&self, raws: &[RawReview], source_app: &str) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        for raw in raws {
            match self.normalize(raw, source_app).await {
                NormalizeOutcome::Accepted { review, translation } => {
                    match translation {
                        Some(TranslationOutcome::Success(_)) if review.is_translated => batch.translated += 1,
                        Some(TranslationOutcome::Fallback { .. }) => batch.translation_fallbacks += 1,
                        _ => {}
                    }
                    batch.accepted.push(review);
                }
                NormalizeOutcome::Rejected(_) => batch.rejected += 1,
            }
        }
        batch
    }
}

/// Clamp a raw score into 1..=5. Non-numeric input counts as 0.
pub fn clamp_rating(score: &Value) -> u8 {
    let raw = match score {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
    .unwrap_or(0);
    raw.clamp(MIN_RATING, MAX_RATING) as u8
}

/// Helpfulness count; missing, invalid or negative input is 0
pub fn parse_thumbs_up(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

/// Review date as `YYYY-MM-DD`, or empty when absent or unparseable.
///
/// Numbers are read as Unix seconds; strings may be RFC 3339, a naive
/// date-time or a bare date.
pub fn format_review_date(value: &Value) -> String {
    let date = match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive()),
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    };
    date.map(|d| d.format(REVIEW_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

pub(crate) fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, REVIEW_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::TranslationProviderPort;
    use crate::app::translator::RetryPolicy;
    use crate::error::{Result, ScraperError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct SuffixProvider {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranslationProviderPort for SuffixProvider {
        fn provider_name(&self) -> &str {
            "suffix"
        }

        async fn translate(&self, text: &str, _source: Option<&str>, _target: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScraperError::Translation("service unavailable".into()));
            }
            Ok(format!("{text} (translated)"))
        }
    }

    fn settings() -> NormalizerSettings {
        NormalizerSettings {
            target_language: "en".into(),
            translation_enabled: true,
            extract_emoji: true,
            min_review_length: 3,
        }
    }

    fn normalizer(settings: NormalizerSettings, fail: bool) -> (ReviewNormalizer, Arc<SuffixProvider>) {
        let provider = Arc::new(SuffixProvider {
            fail,
            calls: AtomicUsize::new(0),
        });
        let policy = RetryPolicy {
            max_attempts: 3,
            timeout: Duration::from_secs(1),
            backoff: Duration::ZERO,
        };
        let min = settings.min_review_length;
        let translator = Translator::new(provider.clone(), policy, min);
        (ReviewNormalizer::new(settings, Some(translator)), provider)
    }

    fn raw(text: &str, score: Value, language: &str) -> RawReview {
        RawReview {
            review_id: Some("gp:AOqpTOE".into()),
            content: Some(text.into()),
            score,
            at: json!(1_717_243_200),
            thumbs_up_count: json!(4),
            ..Default::default()
        }
        .annotate(language, "com.combanketh.mobilebanking", "2024-06-01 12:00:00")
    }

    fn accepted(outcome: NormalizeOutcome) -> NormalizedReview {
        match outcome {
            NormalizeOutcome::Accepted { review, .. } => review,
            NormalizeOutcome::Rejected(r) => panic!("unexpected reject: {r:?}"),
        }
    }

    #[tokio::test]
    async fn test_same_language_not_translated() {
        let (normalizer, provider) = normalizer(settings(), false);
        let review = accepted(normalizer.normalize(&raw("Great app!", json!(7), "en"), "CBE").await);
        assert_eq!(review.review_text_clean, "Great app!");
        assert_eq!(review.rating, 5);
        assert!(!review.is_translated);
        assert_eq!(review.translated_text, "Great app!");
        assert_eq!(review.source_app, "CBE");
        assert_eq!(review.app_identifier, "com.combanketh.mobilebanking");
        assert_eq!(review.review_date, "2024-06-01");
        assert_eq!(review.thumbs_up, 4);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_foreign_language_translated_with_emoji() {
        let (normalizer, _) = normalizer(settings(), false);
        let review = accepted(normalizer.normalize(&raw("👍 good", json!(0), "am"), "CBE").await);
        assert_eq!(review.emojis, vec!["👍"]);
        assert_eq!(review.emoji_count, 1);
        assert_eq!(review.emoji_descriptions.len(), 1);
        assert_eq!(review.rating, 1);
        assert!(review.is_translated);
        assert_eq!(review.translated_text, "👍 good (translated)");
        assert_eq!(review.review_text_clean, "good");
    }

    #[tokio::test]
    async fn test_translation_failure_falls_back() {
        let (normalizer, provider) = normalizer(settings(), true);
        let outcome = normalizer.normalize(&raw("ቆንጆ መተግበሪያ", json!(4), "am"), "BOA").await;
        match outcome {
            NormalizeOutcome::Accepted { review, translation } => {
                assert!(!review.is_translated);
                assert_eq!(review.translated_text, review.review_text);
                assert!(matches!(translation, Some(TranslationOutcome::Fallback { .. })));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_translation_disabled() {
        let mut s = settings();
        s.translation_enabled = false;
        let (normalizer, provider) = normalizer(s, false);
        let review = accepted(normalizer.normalize(&raw("ቆንጆ መተግበሪያ", json!(4), "am"), "BOA").await);
        assert!(!review.is_translated);
        assert_eq!(review.translated_text, review.review_text);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_review_rejected() {
        let (normalizer, _) = normalizer(settings(), false);
        let outcome = normalizer.normalize(&raw("  ok  ", json!(5), "en"), "CBE").await;
        assert_eq!(
            outcome,
            NormalizeOutcome::Rejected(RejectedRecord {
                review_id: "gp:AOqpTOE".into(),
                length: 2,
                minimum: 3,
            })
        );

        let mut missing = raw("", json!(5), "en");
        missing.content = None;
        assert!(matches!(
            normalizer.normalize(&missing, "CBE").await,
            NormalizeOutcome::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_emoji_fields_empty_when_disabled() {
        let mut s = settings();
        s.extract_emoji = false;
        let (normalizer, _) = normalizer(s, false);
        let review = accepted(normalizer.normalize(&raw("😡 crashes daily", json!(1), "en"), "CBE").await);
        assert!(review.emojis.is_empty());
        assert_eq!(review.emoji_count, 0);
        assert!(review.emoji_descriptions.is_empty());
        assert_eq!(review.review_text_clean, "crashes daily");
    }

    #[tokio::test]
    async fn test_batch_counts() {
        let (normalizer, _) = normalizer(settings(), false);
        let raws = vec![
            raw("Great app!", json!(5), "en"),
            raw("no", json!(5), "en"),
            raw("ጥሩ ነው", json!(3), "am"),
        ];
        let batch = normalizer.normalize_batch(&raws, "DASHEN").await;
        assert_eq!(batch.accepted.len(), 2);
        assert_eq!(batch.rejected, 1);
        assert_eq!(batch.translated, 1);
        assert_eq!(batch.translation_fallbacks, 0);
    }

    #[test]
    fn test_clamp_rating() {
        assert_eq!(clamp_rating(&json!(7)), 5);
        assert_eq!(clamp_rating(&json!(0)), 1);
        assert_eq!(clamp_rating(&json!(-3)), 1);
        assert_eq!(clamp_rating(&json!(3)), 3);
        assert_eq!(clamp_rating(&json!(4.9)), 4);
        assert_eq!(clamp_rating(&json!("2")), 2);
        assert_eq!(clamp_rating(&json!(" 9 ")), 5);
        assert_eq!(clamp_rating(&json!("five")), 1);
        assert_eq!(clamp_rating(&Value::Null), 1);
        assert_eq!(clamp_rating(&json!(true)), 1);
        assert_eq!(clamp_rating(&json!(u64::MAX)), 5);
    }

    #[test]
    fn test_parse_thumbs_up() {
        assert_eq!(parse_thumbs_up(&json!(12)), 12);
        assert_eq!(parse_thumbs_up(&json!("8")), 8);
        assert_eq!(parse_thumbs_up(&json!(-1)), 0);
        assert_eq!(parse_thumbs_up(&json!("lots")), 0);
        assert_eq!(parse_thumbs_up(&Value::Null), 0);
    }

    #[test]
    fn test_format_review_date() {
        assert_eq!(format_review_date(&json!(1_717_243_200)), "2024-06-01");
        assert_eq!(format_review_date(&json!("2025-01-03T10:15:00Z")), "2025-01-03");
        assert_eq!(format_review_date(&json!("2025-01-03 10:15:00")), "2025-01-03");
        assert_eq!(format_review_date(&json!("2025-01-03")), "2025-01-03");
        assert_eq!(format_review_date(&json!("invalid")), "");
        assert_eq!(format_review_date(&Value::Null), "");
    }
}
