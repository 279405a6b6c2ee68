//! Google Play review source.
//!
//! Reviews are read from the Play Store web client's batch-execute endpoint,
//! one page per request, following continuation tokens until enough reviews
//! were collected or the store has no more. Listing details come from the
//! `ds:5` dataset embedded in the app's details page.

use crate::app::ports::{AppDetailsPort, ReviewSourcePort};
use crate::error::{Result, ScraperError};
use crate::constants::REVIEW_DATE_FORMAT;
use crate::types::{AppDetails, FetchRequest, RawReview, SortOrder};
use async_trait::async_trait;
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

const BATCH_EXECUTE_URL: &str = "https://play.google.com/_/PlayStoreUi/data/batchexecute";
const REVIEWS_RPC_ID: &str = "UsvDTd";
const DETAILS_URL: &str = "https://play.google.com/store/apps/details";
const DETAILS_DATASET: &str = "ds:5";

/// Largest page the endpoint serves
pub const MAX_PAGE_SIZE: usize = 199;

// Responses start with an anti-JSON-hijacking guard line
static RESPONSE_ENVELOPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\)\]\}'\s*([\s\S]+)").expect("envelope regex is valid"));

// Inline `AF_initDataCallback({key: 'ds:N', ..., data:[...], sideChannel: {}});` blocks
static INIT_DATA_CALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"AF_initDataCallback\(\{key: '(ds:\d+)'[\s\S]*?data:([\s\S]*?), sideChannel: \{\}\}\);")
        .expect("callback regex is valid")
});

/// One page of reviews and the token for the next, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    pub reviews: Vec<RawReview>,
    pub next_token: Option<String>,
}

pub struct GooglePlayReviews {
    client: reqwest::Client,
    page_sleep: Duration,
}

impl GooglePlayReviews {
    /// `timeout` bounds each HTTP request; `page_sleep` is waited between pages
    pub fn new(timeout: Duration, page_sleep: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, page_sleep })
    }

    async fn fetch_page(
        &self,
        request: &FetchRequest,
        count: usize,
        token: Option<&str>,
    ) -> Result<ReviewPage> {
        let fail = |message: String| ScraperError::source_fetch(&request.app_id, &request.language, message);

        let payload = reviews_rpc_payload(&request.app_id, request.sort_order, count, token);
        let response = self
            .client
            .post(BATCH_EXECUTE_URL)
            .query(&[("hl", request.language.as_str()), ("gl", request.country.as_str())])
            .form(&[("f.req", payload)])
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status.as_u16())));
        }
        let body = response.text().await.map_err(|e| fail(e.to_string()))?;
        parse_reviews_page(&body).map_err(|e| fail(e.to_string()))
    }
}

#[async_trait]
impl ReviewSourcePort for GooglePlayReviews {
    fn source_name(&self) -> &str {
        "google_play"
    }

    #[instrument(skip(self), fields(app_id = %request.app_id, language = %request.language))]
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<RawReview>> {
        let mut reviews = Vec::new();
        let mut token: Option<String> = None;

        while reviews.len() < request.max_count {
            let page_size = (request.max_count - reviews.len()).min(MAX_PAGE_SIZE);
            let page = self.fetch_page(request, page_size, token.as_deref()).await?;
            let received = page.reviews.len();
            debug!("Fetched page of {} reviews", received);
            reviews.extend(page.reviews.into_iter().take(page_size));

            match page.next_token {
                Some(next) if received > 0 => token = Some(next),
                _ => break,
            }
            if reviews.len() < request.max_count && !self.page_sleep.is_zero() {
                tokio::time::sleep(self.page_sleep).await;
            }
        }

        info!("Fetched {} reviews", reviews.len());
        Ok(reviews)
    }
}

#[async_trait]
impl AppDetailsPort for GooglePlayReviews {
    #[instrument(skip(self))]
    async fn details(&self, app_id: &str, language: &str, country: &str) -> Result<AppDetails> {
        let response = self
            .client
            .get(DETAILS_URL)
            .query(&[("id", app_id), ("hl", language), ("gl", country)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::source_fetch(
                app_id,
                language,
                format!("details page returned HTTP {}", status.as_u16()),
            ));
        }
        let html = response.text().await?;
        parse_app_details(&html)
    }
}

/// Read title, rating, installs, version and last update from a details page
pub fn parse_app_details(html: &str) -> Result<AppDetails> {
    let captures = INIT_DATA_CALLBACK
        .captures_iter(html)
        .find(|c| &c[1] == DETAILS_DATASET)
        .ok_or_else(|| ScraperError::MissingField(format!("{DETAILS_DATASET} dataset in details page")))?;
    let data: Value = serde_json::from_str(captures[2].trim())?;
    let listing = &data[1][2];

    let title = listing[0][0]
        .as_str()
        .ok_or_else(|| ScraperError::MissingField("app title".into()))?
        .to_string();
    let text = |value: &Value| value.as_str().unwrap_or_default().to_string();
    let updated = listing[145][0][1][0]
        .as_i64()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format(REVIEW_DATE_FORMAT).to_string())
        .unwrap_or_default();

    Ok(AppDetails {
        title,
        score: listing[51][0][1].as_f64(),
        installs: text(&listing[13][0]),
        version: text(&listing[140][0][0][0]),
        updated,
    })
}

/// Form value for the reviews RPC
pub fn reviews_rpc_payload(app_id: &str, sort: SortOrder, count: usize, token: Option<&str>) -> String {
    let inner = json!([
        null,
        null,
        [2, sort.code(), [count, null, token], null, [null, null]],
        [app_id, 7]
    ]);
    json!([[[REVIEWS_RPC_ID, inner.to_string(), null, "generic"]]]).to_string()
}

/// Parse a batch-execute response body into reviews.
///
/// A response without a review list is an empty page, not an error.
pub fn parse_reviews_page(body: &str) -> Result<ReviewPage> {
    let Some(captures) = RESPONSE_ENVELOPE.captures(body) else {
        return Ok(ReviewPage::default());
    };
    let envelope: Value = serde_json::from_str(captures[1].trim())?;
    let Some(inner) = envelope[0][2].as_str() else {
        return Ok(ReviewPage::default());
    };
    let data: Value = serde_json::from_str(inner)?;

    let reviews = data[0]
        .as_array()
        .map(|items| items.iter().map(review_from_item).collect())
        .unwrap_or_default();

    let next_token = data
        .as_array()
        .filter(|parts| parts.len() >= 2)
        .and_then(|parts| parts[parts.len() - 2].as_array())
        .and_then(|tail| tail.last())
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ReviewPage { reviews, next_token })
}

fn review_from_item(item: &Value) -> RawReview {
    RawReview {
        review_id: item[0].as_str().map(str::to_string),
        content: item[4].as_str().map(str::to_string),
        score: item[2].clone(),
        at: item[5][0].clone(),
        thumbs_up_count: item[6].clone(),
        ..Default::default()
    }
}
