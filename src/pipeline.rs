use crate::app::normalize_use_case::{NormalizedBatch, NormalizerSettings, ReviewNormalizer};
use crate::app::ports::{AppDetailsPort, PacingPort, ReviewSourcePort, TranslationProviderPort};
use crate::app::translator::{RetryPolicy, Translator};
use crate::config::{AppConfig, Config, OutputFormat, OutputMode, TranslationProviderKind};
use crate::constants::SCRAPE_TIMESTAMP_FORMAT;
use crate::error::Result;
use crate::infra::csv_sink::CsvFileSink;
use crate::infra::google_play::GooglePlayReviews;
use crate::infra::google_translate::GoogleWebTranslator;
use crate::infra::json_sink::JsonFileSink;
use crate::infra::mymemory::MyMemoryTranslator;
use crate::infra::pacing::{FixedIntervalPacer, TokenBucketPacer};
use crate::storage::ReviewSink;
use crate::types::{AppDetails, FetchRequest, NormalizedReview, RawReview, SortOrder};
use chrono::{DateTime, Local, Utc};
use metrics::{counter, histogram};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Progress of one (app, language) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Pending,
    Fetching,
    Normalizing,
    Aggregated,
    Failed,
}

/// What happened to one (app, language) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairReport {
    pub app_key: String,
    pub app_name: String,
    pub language: String,
    pub state: PairState,
    pub fetched: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub translated: usize,
    pub translation_fallbacks: usize,
    pub error: Option<String>,
}

impl PairReport {
    fn pending(app: &AppConfig, language: &str) -> Self {
        Self {
            app_key: app.key.clone(),
            app_name: app.name.clone(),
            language: language.to_string(),
            state: PairState::Pending,
            fetched: 0,
            accepted: 0,
            rejected: 0,
            translated: 0,
            translation_fallbacks: 0,
            error: None,
        }
    }

    fn transition(&mut self, next: PairState) {
        debug!(app = %self.app_key, language = %self.language, "{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn succeeded(&self) -> bool {
        self.state == PairState::Aggregated
    }
}

/// Accepted records of one app, in language order
#[derive(Debug, Clone, PartialEq)]
pub struct AppRecords {
    pub app_key: String,
    pub app_name: String,
    pub records: Vec<NormalizedReview>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Written { location: String, records: usize },
    Failed { error: String },
}

/// Result of one sink write; `app_key` is `None` for a combined write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub app_key: Option<String>,
    pub destination: String,
    pub outcome: SinkOutcome,
}

/// Summary of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Listing details per app key, for apps whose lookup succeeded
    pub app_details: Vec<(String, AppDetails)>,
    pub pairs: Vec<PairReport>,
    pub sinks: Vec<SinkReport>,
}

impl RunSummary {
    pub fn pairs_succeeded(&self) -> usize {
        self.pairs.iter().filter(|p| p.succeeded()).count()
    }

    pub fn pairs_failed(&self) -> usize {
        self.pairs.len() - self.pairs_succeeded()
    }

    pub fn total_reviews(&self) -> usize {
        self.pairs.iter().map(|p| p.accepted).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.pairs.iter().map(|p| p.rejected).sum()
    }

    pub fn total_translated(&self) -> usize {
        self.pairs.iter().map(|p| p.translated).sum()
    }

    pub fn total_translation_fallbacks(&self) -> usize {
        self.pairs.iter().map(|p| p.translation_fallbacks).sum()
    }

    /// Accepted reviews per app name, in configuration order
    pub fn reviews_by_app(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for pair in &self.pairs {
            match counts.iter_mut().find(|(name, _)| *name == pair.app_name) {
                Some((_, count)) => *count += pair.accepted,
                None => counts.push((pair.app_name.clone(), pair.accepted)),
            }
        }
        counts
    }

    pub fn reviews_by_language(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for pair in &self.pairs {
            *counts.entry(pair.language.clone()).or_insert(0) += pair.accepted;
        }
        counts
    }

    pub fn sink_failures(&self) -> usize {
        self.sinks
            .iter()
            .filter(|s| matches!(s.outcome, SinkOutcome::Failed { .. }))
            .count()
    }

    /// True when any pair or any write failed
    pub fn is_partial_failure(&self) -> bool {
        self.pairs_failed() > 0 || self.sink_failures() > 0
    }
}

struct PairResult {
    report: PairReport,
    records: Vec<NormalizedReview>,
}

/// Fetches and normalizes one pair; cheap to clone into tasks
#[derive(Clone)]
struct PairWorker {
    source: Arc<dyn ReviewSourcePort>,
    normalizer: Arc<ReviewNormalizer>,
    pacer: Arc<dyn PacingPort>,
    country: String,
    sort_order: SortOrder,
    max_count: usize,
}

impl PairWorker {
    #[instrument(skip(self, app), fields(app = %app.key, language = %language))]
    async fn process(&self, app: &AppConfig, language: &str) -> PairResult {
        let mut report = PairReport::pending(app, language);
        let request = FetchRequest {
            app_id: app.id.clone(),
            language: language.to_string(),
            country: self.country.clone(),
            sort_order: self.sort_order,
            max_count: self.max_count,
        };

        self.pacer.acquire().await;
        report.transition(PairState::Fetching);
        info!(
            source = self.source.source_name(),
            "📡 Scraping {} reviews for {}...",
            language.to_uppercase(),
            app.name
        );
        let t_fetch = Instant::now();
        let fetched = self.source.fetch(&request).await;
        histogram!("reviews_fetch_duration_seconds", "app" => app.key.clone())
            .record(t_fetch.elapsed().as_secs_f64());

        let raws = match fetched {
            Ok(raws) => raws,
            Err(e) => {
                error!("✗ Error scraping {} reviews for {}: {}", language.to_uppercase(), app.name, e);
                counter!("reviews_pairs_failed_total", "app" => app.key.clone()).increment(1);
                report.error = Some(e.to_string());
                report.transition(PairState::Failed);
                return PairResult {
                    report,
                    records: Vec::new(),
                };
            }
        };

        let timestamp = Local::now().format(SCRAPE_TIMESTAMP_FORMAT).to_string();
        let raws: Vec<RawReview> = raws
            .into_iter()
            .map(|raw| raw.annotate(language, &app.id, &timestamp))
            .collect();
        report.fetched = raws.len();
        info!("✓ Found {} {} reviews", raws.len(), language.to_uppercase());
        counter!("reviews_pairs_fetched_total", "app" => app.key.clone()).increment(1);

        report.transition(PairState::Normalizing);
        let NormalizedBatch {
            accepted,
            rejected,
            translated,
            translation_fallbacks,
        } = self.normalizer.normalize_batch(&raws, &app.name).await;

        report.accepted = accepted.len();
        report.rejected = rejected;
        report.translated = translated;
        report.translation_fallbacks = translation_fallbacks;
        counter!("reviews_accepted_total", "app" => app.key.clone()).increment(accepted.len() as u64);
        counter!("reviews_rejected_total", "app" => app.key.clone()).increment(rejected as u64);
        report.transition(PairState::Aggregated);

        PairResult {
            report,
            records: accepted,
        }
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// Ingestion orchestrator: apps × languages → normalized records → sink
pub struct Pipeline {
    config: Arc<Config>,
    worker: PairWorker,
    sink: Arc<dyn ReviewSink>,
    details: Option<Arc<dyn AppDetailsPort>>,
}

impl Pipeline {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn ReviewSourcePort>,
        normalizer: ReviewNormalizer,
        pacer: Arc<dyn PacingPort>,
        sink: Arc<dyn ReviewSink>,
    ) -> Self {
        let worker = PairWorker {
            source,
            normalizer: Arc::new(normalizer),
            pacer,
            country: config.country.clone(),
            sort_order: config.sort_order,
            max_count: config.reviews_per_language,
        };
        Self {
            config,
            worker,
            sink,
            details: None,
        }
    }

    /// Look up listing details for each app before its reviews
    pub fn with_app_details(mut self, details: Arc<dyn AppDetailsPort>) -> Self {
        self.details = Some(details);
        self
    }

    /// Wire the production adapters selected by `config`
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        config.validate()?;

        let source = Arc::new(GooglePlayReviews::new(
            config.source.timeout(),
            config.source.page_sleep(),
        )?);

        let translator = if config.translation.enabled {
            let timeout = config.translation.timeout();
            let provider: Arc<dyn TranslationProviderPort> = match config.translation.provider {
                TranslationProviderKind::Google => Arc::new(GoogleWebTranslator::new(timeout)?),
                TranslationProviderKind::Mymemory => Arc::new(MyMemoryTranslator::new(timeout)?),
            };
            Some(Translator::new(
                provider,
                RetryPolicy::from_config(&config.translation),
                config.min_review_length,
            ))
        } else {
            None
        };
        let normalizer = ReviewNormalizer::new(NormalizerSettings::from_config(&config), translator);

        let pacer: Arc<dyn PacingPort> = if config.max_concurrent_fetches > 1 {
            Arc::new(TokenBucketPacer::from_interval(config.pacing_interval(), 1))
        } else {
            Arc::new(FixedIntervalPacer::new(config.pacing_interval()))
        };

        let sink: Arc<dyn ReviewSink> = match config.output.format {
            OutputFormat::Csv => Arc::new(CsvFileSink::new(
                &config.output.directory,
                config.emoji.extract,
                config.output.utf8_bom,
            )),
            OutputFormat::Json => Arc::new(JsonFileSink::new(&config.output.directory)),
        };

        Ok(Self::new(config, source.clone(), normalizer, pacer, sink).with_app_details(source))
    }

    /// Run every configured pair, deliver records and summarize.
    ///
    /// Fails only on configuration errors, before anything is fetched.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, "🚀 Starting review scrape for {} apps", self.config.apps.len());
        counter!("reviews_runs_total").increment(1);

        let (app_details, results) = if self.config.max_concurrent_fetches > 1 {
            self.process_concurrently().await
        } else {
            self.process_sequentially().await
        };

        let (pairs, groups) = self.aggregate(results);
        let sinks = self.deliver(&groups).await;

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            app_details,
            pairs,
            sinks,
        };
        info!(
            %run_id,
            "🏁 Run finished: {} reviews, {} pairs ok, {} pairs failed, {} sink failures",
            summary.total_reviews(),
            summary.pairs_succeeded(),
            summary.pairs_failed(),
            summary.sink_failures()
        );
        Ok(summary)
    }

    fn pairs(&self) -> Vec<(AppConfig, String)> {
        self.config
            .apps
            .iter()
            .flat_map(|app| app.languages.iter().map(move |lang| (app.clone(), lang.clone())))
            .collect()
    }

    async fn process_sequentially(&self) -> (Vec<(String, AppDetails)>, Vec<PairResult>) {
        let mut details = Vec::new();
        let mut results = Vec::new();
        for app in &self.config.apps {
            if let Some(found) = self.describe_app(app).await {
                details.push((app.key.clone(), found));
            }
            for language in &app.languages {
                results.push(self.worker.process(app, language).await);
            }
        }
        (details, results)
    }

    /// Bounded fan-out; results come back in configuration order
    async fn process_concurrently(&self) -> (Vec<(String, AppDetails)>, Vec<PairResult>) {
        let mut details = Vec::new();
        for app in &self.config.apps {
            if let Some(found) = self.describe_app(app).await {
                details.push((app.key.clone(), found));
            }
        }

        let pairs = self.pairs();
        let limit = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));
        let mut tasks = JoinSet::new();

        for (index, (app, language)) in pairs.iter().cloned().enumerate() {
            let worker = self.worker.clone();
            let limit = limit.clone();
            tasks.spawn(async move {
                let _permit = limit.acquire_owned().await.ok();
                (index, worker.process(&app, &language).await)
            });
        }

        let mut slots: Vec<Option<PairResult>> = pairs.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!("Pair task did not complete: {}", e),
            }
        }

        let results = slots
            .into_iter()
            .zip(pairs)
            .map(|(slot, (app, language))| {
                slot.unwrap_or_else(|| {
                    let mut report = PairReport::pending(&app, &language);
                    report.error = Some("task aborted".to_string());
                    report.transition(PairState::Failed);
                    PairResult {
                        report,
                        records: Vec::new(),
                    }
                })
            })
            .collect();
        (details, results)
    }

    /// Fetch and show an app's listing; a failed lookup only warns
    async fn describe_app(&self, app: &AppConfig) -> Option<AppDetails> {
        let port = self.details.as_ref()?;
        match port
            .details(&app.id, &self.config.target_language, &self.config.country)
            .await
        {
            Ok(details) => {
                let score = details
                    .score
                    .map(|s| format!("{s:.1}"))
                    .unwrap_or_else(|| "N/A".to_string());
                info!(
                    app = %app.key,
                    title = %details.title,
                    score = %score,
                    installs = %details.installs,
                    version = %details.version,
                    updated = %details.updated,
                    "📱 App details"
                );
                println!("\n📱 {}", details.title);
                println!("   ⭐ Rating: {} ★", score);
                println!("   📥 Installs: {}", details.installs);
                println!("   🔄 Version: {}", or_na(&details.version));
                println!("   📅 Last Updated: {}", or_na(&details.updated));
                Some(details)
            }
            Err(e) => {
                warn!("⚠️ Could not get app info for {}: {}", app.name, e);
                None
            }
        }
    }

    /// Group records by app, keeping configuration order
    fn aggregate(&self, results: Vec<PairResult>) -> (Vec<PairReport>, Vec<AppRecords>) {
        let mut groups: Vec<AppRecords> = self
            .config
            .apps
            .iter()
            .map(|app| AppRecords {
                app_key: app.key.clone(),
                app_name: app.name.clone(),
                records: Vec::new(),
            })
            .collect();
        let mut reports = Vec::with_capacity(results.len());

        for PairResult { report, records } in results {
            if let Some(group) = groups.iter_mut().find(|g| g.app_key == report.app_key) {
                group.records.extend(records);
            }
            reports.push(report);
        }
        (reports, groups)
    }

    async fn deliver(&self, groups: &[AppRecords]) -> Vec<SinkReport> {
        let mut reports = Vec::new();
        match self.config.output.mode {
            OutputMode::PerApp => {
                for group in groups {
                    if group.records.is_empty() {
                        warn!("⚠️ No reviews for {}, nothing written", group.app_name);
                        continue;
                    }
                    let destination = self.config.output.filename_for(&group.app_name);
                    reports.push(
                        self.write(Some(group.app_key.clone()), &group.records, destination)
                            .await,
                    );
                }
            }
            OutputMode::Combined => {
                let all: Vec<NormalizedReview> = groups
                    .iter()
                    .flat_map(|g| g.records.iter().cloned())
                    .collect();
                if all.is_empty() {
                    warn!("❌ No reviews were scraped, nothing written");
                } else {
                    let destination = self.config.output.combined_filename.clone();
                    reports.push(self.write(None, &all, destination).await);
                }
            }
        }
        reports
    }

    async fn write(
        &self,
        app_key: Option<String>,
        records: &[NormalizedReview],
        destination: String,
    ) -> SinkReport {
        let outcome = match self.sink.write(records, &destination).await {
            Ok(location) => SinkOutcome::Written {
                location,
                records: records.len(),
            },
            Err(e) => {
                error!("❌ Error saving to {}: {}", destination, e);
                counter!("reviews_sink_failures_total").increment(1);
                SinkOutcome::Failed { error: e.to_string() }
            }
        };
        SinkReport {
            app_key,
            destination,
            outcome,
        }
    }
}
