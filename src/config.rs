use crate::constants::*;
use crate::error::{Result, ScraperError};
use crate::types::SortOrder;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Complete run configuration.
///
/// Built once at startup and handed by reference to every component. Unknown
/// keys anywhere in the file are rejected at load time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub target_language: String,
    pub min_review_length: usize,
    pub reviews_per_language: usize,
    pub sleep_seconds_between_requests: f64,
    pub country: String,
    pub sort_order: SortOrder,
    pub max_concurrent_fetches: usize,
    pub translation: TranslationConfig,
    pub emoji: EmojiConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
    pub apps: Vec<AppConfig>,
    pub language_names: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProviderKind {
    #[default]
    Google,
    Mymemory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub provider: TranslationProviderKind,
    pub retries: u32,
    pub timeout_seconds: f64,
    pub backoff_seconds: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmojiConfig {
    pub extract: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub page_sleep_seconds: f64,
    pub timeout_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Whether each app gets its own destination or all apps share one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    PerApp,
    Combined,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: String,
    pub format: OutputFormat,
    pub mode: OutputMode,
    pub filename: String,
    pub combined_filename: String,
    pub utf8_bom: bool,
}

/// One monitored banking app
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub key: String,
    pub id: String,
    pub name: String,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

fn default_languages() -> Vec<String> {
    vec![DEFAULT_TARGET_LANGUAGE.to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            min_review_length: DEFAULT_MIN_REVIEW_LENGTH,
            reviews_per_language: DEFAULT_REVIEWS_PER_LANGUAGE,
            sleep_seconds_between_requests: DEFAULT_SLEEP_SECONDS,
            country: DEFAULT_COUNTRY.to_string(),
            sort_order: SortOrder::default(),
            max_concurrent_fetches: 1,
            translation: TranslationConfig::default(),
            emoji: EmojiConfig::default(),
            source: SourceConfig::default(),
            output: OutputConfig::default(),
            apps: Vec::new(),
            language_names: BTreeMap::new(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: TranslationProviderKind::default(),
            retries: DEFAULT_TRANSLATION_RETRIES,
            timeout_seconds: DEFAULT_TRANSLATION_TIMEOUT_SECONDS,
            backoff_seconds: DEFAULT_TRANSLATION_BACKOFF_SECONDS,
        }
    }
}

impl Default for EmojiConfig {
    fn default() -> Self {
        Self { extract: true }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            page_sleep_seconds: DEFAULT_PAGE_SLEEP_SECONDS,
            timeout_seconds: DEFAULT_SOURCE_TIMEOUT_SECONDS,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_OUTPUT_DIRECTORY.to_string(),
            format: OutputFormat::default(),
            mode: OutputMode::default(),
            filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            combined_filename: DEFAULT_COMBINED_FILENAME.to_string(),
            utf8_bom: true,
        }
    }
}

impl Config {
    /// Read, parse and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would fail or misbehave mid-run
    pub fn validate(&self) -> Result<()> {
        if self.apps.is_empty() {
            return Err(ScraperError::Config("no apps configured".into()));
        }
        if self.target_language.trim().is_empty() {
            return Err(ScraperError::Config("target_language must not be empty".into()));
        }
        if self.reviews_per_language == 0 {
            return Err(ScraperError::Config(
                "reviews_per_language must be greater than 0".into(),
            ));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(ScraperError::Config(
                "max_concurrent_fetches must be at least 1".into(),
            ));
        }

        let durations = [
            ("sleep_seconds_between_requests", self.sleep_seconds_between_requests),
            ("translation.timeout_seconds", self.translation.timeout_seconds),
            ("translation.backoff_seconds", self.translation.backoff_seconds),
            ("source.page_sleep_seconds", self.source.page_sleep_seconds),
            ("source.timeout_seconds", self.source.timeout_seconds),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ScraperError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ScraperError::Config(format!("{name} is too large, got {value}")));
            }
        }

        let mut seen = HashSet::new();
        for app in &self.apps {
            if app.key.trim().is_empty() || app.id.trim().is_empty() || app.name.trim().is_empty() {
                return Err(ScraperError::Config(format!(
                    "app '{}' must have a key, id and name",
                    app.key
                )));
            }
            if !seen.insert(app.key.as_str()) {
                return Err(ScraperError::Config(format!("duplicate app key '{}'", app.key)));
            }
            if app.languages.is_empty() {
                return Err(ScraperError::Config(format!(
                    "app '{}' has no languages",
                    app.key
                )));
            }
        }

        if self.output.mode == OutputMode::PerApp && !self.output.filename.contains(BANK_PLACEHOLDER) {
            return Err(ScraperError::Config(format!(
                "output.filename must contain {BANK_PLACEHOLDER} when output.mode is per_app"
            )));
        }
        if self.output.mode == OutputMode::PerApp {
            let mut destinations = HashMap::new();
            for app in &self.apps {
                let destination = self.output.filename_for(&app.name);
                if let Some(other) = destinations.insert(destination.clone(), app.key.as_str()) {
                    return Err(ScraperError::Config(format!(
                        "apps '{}' and '{}' would both write to {}",
                        other, app.key, destination
                    )));
                }
            }
        }
        Ok(())
    }

    /// Keep only the apps whose keys are listed, in configuration order
    pub fn restrict_to(&self, keys: &[String]) -> Result<Config> {
        for key in keys {
            if !self.apps.iter().any(|a| &a.key == key) {
                return Err(ScraperError::Config(format!("unknown app key '{key}'")));
            }
        }
        let mut restricted = self.clone();
        restricted.apps.retain(|a| keys.contains(&a.key));
        restricted.validate()?;
        Ok(restricted)
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sleep_seconds_between_requests)
    }

    /// Human name for a language code, falling back to the code itself
    pub fn language_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.language_names.get(code).map(String::as_str).unwrap_or(code)
    }
}

impl TranslationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_seconds)
    }
}

impl SourceConfig {
    pub fn page_sleep(&self) -> Duration {
        Duration::from_secs_f64(self.page_sleep_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }
}

impl OutputConfig {
    /// Destination file name for one app's records
    pub fn filename_for(&self, app_name: &str) -> String {
        self.filename.replace(BANK_PLACEHOLDER, &app_name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[apps]]
        key = "cbe"
        id = "com.combanketh.mobilebanking"
        name = "CBE"
        languages = ["en", "am"]
    "#;

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.target_language, "en");
        assert_eq!(config.min_review_length, 3);
        assert_eq!(config.reviews_per_language, 200);
        assert_eq!(config.country, "et");
        assert_eq!(config.sort_order, SortOrder::MostRelevant);
        assert!(config.translation.enabled);
        assert_eq!(config.translation.retries, 3);
        assert_eq!(config.translation.timeout(), Duration::from_secs(5));
        assert!(config.emoji.extract);
        assert_eq!(config.output.mode, OutputMode::PerApp);
        assert_eq!(config.apps[0].languages, vec!["en", "am"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let content = format!("batch_size = 10\n{MINIMAL}");
        let err = Config::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, ScraperError::Toml(_)));

        let nested = format!("[translation]\nprovider = \"google\"\nbatch = 3\n{MINIMAL}");
        assert!(Config::from_toml_str(&nested).is_err());
    }

    #[test]
    fn test_empty_app_set_fails_fast() {
        let err = Config::from_toml_str("target_language = \"en\"").unwrap_err();
        assert!(err.to_string().contains("no apps configured"));
    }

    #[test]
    fn test_duplicate_app_key_rejected() {
        let content = format!("{MINIMAL}\n{MINIMAL}");
        let err = Config::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("duplicate app key"));
    }

    #[test]
    fn test_negative_sleep_rejected() {
        let content = format!("sleep_seconds_between_requests = -1.0\n{MINIMAL}");
        assert!(Config::from_toml_str(&content).is_err());
    }

    #[test]
    fn test_oversized_duration_rejected() {
        let content = format!("sleep_seconds_between_requests = 1e30\n{MINIMAL}");
        let err = Config::from_toml_str(&content).unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
        assert!(err.to_string().contains("sleep_seconds_between_requests"));

        let nested = format!("[translation]\ntimeout_seconds = 1e300\n{MINIMAL}");
        assert!(matches!(Config::from_toml_str(&nested), Err(ScraperError::Config(_))));
    }

    #[test]
    fn test_per_app_destinations_must_differ() {
        let content = format!(
            "{MINIMAL}\n[[apps]]\nkey = \"cbe_beta\"\nid = \"com.combanketh.beta\"\nname = \"cbe\"\n"
        );
        let err = Config::from_toml_str(&content).unwrap_err();
        assert!(err.to_string().contains("bank_reviews_cbe.csv"));

        let combined = format!("[output]\nmode = \"combined\"\n{content}");
        assert!(Config::from_toml_str(&combined).is_ok());
    }

    #[test]
    fn test_per_app_filename_requires_placeholder() {
        let content = format!("[output]\nfilename = \"reviews.csv\"\n{MINIMAL}");
        assert!(Config::from_toml_str(&content).is_err());

        let combined = format!("[output]\nfilename = \"reviews.csv\"\nmode = \"combined\"\n{MINIMAL}");
        assert!(Config::from_toml_str(&combined).is_ok());
    }

    #[test]
    fn test_restrict_to_known_keys() {
        let content = format!(
            "{MINIMAL}\n[[apps]]\nkey = \"boa\"\nid = \"com.boa.boaMobileBanking\"\nname = \"BOA\"\n"
        );
        let config = Config::from_toml_str(&content).unwrap();
        let only_boa = config.restrict_to(&["boa".to_string()]).unwrap();
        assert_eq!(only_boa.apps.len(), 1);
        assert_eq!(only_boa.apps[0].languages, vec!["en"]);
        assert!(config.restrict_to(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_filename_for_app() {
        let output = OutputConfig::default();
        assert_eq!(output.filename_for("DASHEN"), "bank_reviews_dashen.csv");
    }
}
