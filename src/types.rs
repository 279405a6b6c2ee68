use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Review order requested from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    MostRelevant,
    Newest,
    Rating,
}

impl SortOrder {
    /// Numeric code understood by the Play Store review RPC
    pub fn code(self) -> u8 {
        match self {
            SortOrder::MostRelevant => 1,
            SortOrder::Newest => 2,
            SortOrder::Rating => 3,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::MostRelevant => "most_relevant",
            SortOrder::Newest => "newest",
            SortOrder::Rating => "rating",
        };
        f.write_str(name)
    }
}

/// One query against the review source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub app_id: String,
    pub language: String,
    pub country: String,
    pub sort_order: SortOrder,
    pub max_count: usize,
}

/// Unprocessed review as returned by a source.
///
/// Score, timestamp and helpfulness are kept as loosely typed JSON values because
/// sources disagree on their shape; the normalizer decides how to read them.
/// `language`, `app_id` and `scrape_timestamp` are empty until the orchestrator
/// annotates the review after retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub review_id: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub score: Value,
    #[serde(default)]
    pub at: Value,
    #[serde(default)]
    pub thumbs_up_count: Value,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub scrape_timestamp: String,
}

impl RawReview {
    /// Tag a fetched review with the query context it came from
    pub fn annotate(mut self, language: &str, app_id: &str, scrape_timestamp: &str) -> Self {
        self.language = language.to_string();
        self.app_id = app_id.to_string();
        self.scrape_timestamp = scrape_timestamp.to_string();
        self
    }
}

/// Canonical output record, schema-stable across apps and languages.
///
/// Serialized field names follow the tabular column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReview {
    pub review_id: String,
    #[serde(rename = "bank")]
    pub source_app: String,
    #[serde(rename = "app_id")]
    pub app_identifier: String,
    #[serde(rename = "review")]
    pub review_text: String,
    #[serde(rename = "review_clean")]
    pub review_text_clean: String,
    pub rating: u8,
    #[serde(rename = "date")]
    pub review_date: String,
    pub thumbs_up: u64,
    pub language: String,
    pub scrape_timestamp: String,
    #[serde(rename = "translated_review")]
    pub translated_text: String,
    pub is_translated: bool,
    #[serde(default)]
    pub emojis: Vec<String>,
    #[serde(default)]
    pub emoji_count: usize,
    #[serde(default)]
    pub emoji_descriptions: Vec<String>,
}

/// Store listing metadata shown before an app's reviews are scraped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppDetails {
    pub title: String,
    pub score: Option<f64>,
    pub installs: String,
    pub version: String,
    /// Last update as `YYYY-MM-DD`, empty when unknown
    pub updated: String,
}
