/// Defaults and fixed names shared across the crate.

// Configuration defaults
pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";
pub const CONFIG_ENV_VAR: &str = "REVIEWS_CONFIG";
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";
pub const DEFAULT_COUNTRY: &str = "et";
pub const DEFAULT_MIN_REVIEW_LENGTH: usize = 3;
pub const DEFAULT_REVIEWS_PER_LANGUAGE: usize = 200;
pub const DEFAULT_SLEEP_SECONDS: f64 = 2.0;
pub const DEFAULT_TRANSLATION_RETRIES: u32 = 3;
pub const DEFAULT_TRANSLATION_TIMEOUT_SECONDS: f64 = 5.0;
pub const DEFAULT_TRANSLATION_BACKOFF_SECONDS: f64 = 1.0;
pub const DEFAULT_PAGE_SLEEP_SECONDS: f64 = 1.0;
pub const DEFAULT_SOURCE_TIMEOUT_SECONDS: f64 = 30.0;
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "data";
pub const DEFAULT_OUTPUT_FILENAME: &str = "bank_reviews_{bank}.csv";
pub const DEFAULT_COMBINED_FILENAME: &str = "bank_reviews.csv";

/// Placeholder replaced by the lower-cased display name in per-app filenames
pub const BANK_PLACEHOLDER: &str = "{bank}";

/// Label stamped on cleaned datasets
pub const SOURCE_LABEL: &str = "Google Play Store";

// Tabular column order for normalized reviews
pub const BASE_COLUMNS: [&str; 12] = [
    "review_id",
    "bank",
    "app_id",
    "review",
    "review_clean",
    "rating",
    "date",
    "thumbs_up",
    "language",
    "scrape_timestamp",
    "translated_review",
    "is_translated",
];
pub const EMOJI_COLUMNS: [&str; 3] = ["emojis", "emoji_count", "emoji_descriptions"];

// Columns produced by the cleaning step
pub const CLEANED_COLUMNS: [&str; 5] = ["review", "rating", "date", "bank", "source"];
pub const CLEANING_REQUIRED_COLUMNS: [&str; 4] = ["review_id", "review", "rating", "date"];

/// Format of `scrape_timestamp`
pub const SCRAPE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Format of `date`
pub const REVIEW_DATE_FORMAT: &str = "%Y-%m-%d";

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;
