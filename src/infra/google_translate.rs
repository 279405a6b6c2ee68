use crate::app::ports::TranslationProviderPort;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;

const TRANSLATE_URL: &str = "https://translate.google.com/m";

/// Longest text the mobile endpoint accepts
pub const MAX_CHARS: usize = 5000;
const RESULT_SELECTOR: &str = "div.result-container, div.t0";

/// Google Translate through its mobile web page.
///
/// The source language is always auto-detected; store language filters say
/// little about the language a review is actually written in.
#[derive(Clone)]
pub struct GoogleWebTranslator {
    client: reqwest::Client,
}

impl GoogleWebTranslator {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TranslationProviderPort for GoogleWebTranslator {
    fn provider_name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: Option<&str>,
        target_language: &str,
    ) -> Result<String> {
        if text.chars().count() > MAX_CHARS {
            return Err(ScraperError::Translation(format!(
                "text exceeds {MAX_CHARS} characters"
            )));
        }

        let response = self
            .client
            .get(TRANSLATE_URL)
            .query(&[("sl", "auto"), ("tl", target_language), ("q", text)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Translation(format!(
                "Google Translate responded with HTTP {}",
                status.as_u16()
            )));
        }
        let html = response.text().await?;
        extract_translation(&html)
            .ok_or_else(|| ScraperError::Translation("no translation found in response".into()))
    }
}

/// Pull the translated text out of the mobile result page
pub fn extract_translation(html: &str) -> Option<String> {
    let selector = Selector::parse(RESULT_SELECTOR).ok()?;
    let document = Html::parse_document(html);
    let element = document.select(&selector).next()?;
    let text = element.text().collect::<Vec<_>>().join("");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
