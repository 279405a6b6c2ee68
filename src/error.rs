use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Fetching {app_id} [{language}] failed: {message}")]
    SourceFetch {
        app_id: String,
        language: String,
        message: String,
    },

    #[error("Translation provider error: {0}")]
    Translation(String),

    #[error("Translation timed out after {0:?}")]
    TranslationTimeout(Duration),

    #[error("Writing to {destination} failed: {message}")]
    SinkWrite { destination: String, message: String },
}

impl ScraperError {
    pub fn source_fetch(app_id: &str, language: &str, message: impl Into<String>) -> Self {
        ScraperError::SourceFetch {
            app_id: app_id.to_string(),
            language: language.to_string(),
            message: message.into(),
        }
    }

    pub fn sink_write(destination: &str, message: impl Into<String>) -> Self {
        ScraperError::SinkWrite {
            destination: destination.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
