use anyhow::{bail, Context, Result};
use bank_review_scraper::config::Config;
use bank_review_scraper::constants::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use bank_review_scraper::logging;
use bank_review_scraper::pipeline::{Pipeline, RunSummary, SinkOutcome};
use bank_review_scraper::preprocess::{self, CleaningStatus};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "bank-review-scraper")]
#[command(about = "Banking app review scraper and normalizer")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration (defaults to $REVIEWS_CONFIG, then config/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize and store reviews for the configured apps
    Scrape {
        /// Specific apps to run (comma-separated keys from the configuration)
        #[arg(long)]
        apps: Option<String>,
    },
    /// Clean previously written review files
    Clean {
        /// Review CSV files to clean
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Directory for the cleaned files
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,
    },
    /// Load and validate the configuration, then exit
    CheckConfig,
}

fn config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn load_config(flag: Option<PathBuf>) -> Result<Config> {
    let path = config_path(flag);
    info!("Loading configuration from {}", path.display());
    Config::load(&path).with_context(|| format!("invalid configuration in {}", path.display()))
}

fn print_summary(config: &Config, summary: &RunSummary) {
    println!("\n📊 Scraping summary (run {})", summary.run_id);
    println!("   Total reviews: {}", summary.total_reviews());
    println!(
        "   Pairs: {} succeeded, {} failed",
        summary.pairs_succeeded(),
        summary.pairs_failed()
    );
    println!("   Rejected as too short: {}", summary.total_rejected());
    println!(
        "   Translated: {} ({} fell back to original text)",
        summary.total_translated(),
        summary.total_translation_fallbacks()
    );

    println!("\n🏦 Reviews per app:");
    for (app, count) in summary.reviews_by_app() {
        println!("   - {}: {}", app, count);
    }

    println!("\n🌐 Reviews per language:");
    for (code, count) in summary.reviews_by_language() {
        println!("   - {}: {}", config.language_name(&code), count);
    }

    let failed: Vec<_> = summary.pairs.iter().filter(|p| !p.succeeded()).collect();
    if !failed.is_empty() {
        println!("\n⚠️  Failed fetches:");
        for pair in failed {
            println!(
                "   - {} [{}]: {}",
                pair.app_name,
                pair.language,
                pair.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!("\n💾 Output:");
    if summary.sinks.is_empty() {
        println!("   ❌ Nothing was written");
    }
    for sink in &summary.sinks {
        match &sink.outcome {
            SinkOutcome::Written { location, records } => {
                println!("   ✅ {} reviews -> {}", records, location)
            }
            SinkOutcome::Failed { error } => println!("   ❌ {}: {}", sink.destination, error),
        }
    }
}

async fn scrape(config: Config, apps: Option<String>) -> Result<()> {
    let config = match apps {
        Some(list) => {
            let keys: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
            config.restrict_to(&keys)?
        }
        None => config,
    };
    let config = Arc::new(config);

    println!("🔄 Scraping reviews for {} apps...", config.apps.len());
    let pipeline = Pipeline::from_config(config.clone())?;
    let summary = pipeline.run().await?;
    print_summary(&config, &summary);

    if summary.is_partial_failure() {
        println!("\n⚠️  Run finished with failures");
    } else {
        println!("\n✅ Run completed successfully");
    }
    Ok(())
}

fn clean(inputs: &[PathBuf], output_dir: &Path) -> Result<()> {
    println!("🧹 Cleaning {} files...", inputs.len());
    let mut failed = 0;
    for input in inputs {
        let report = preprocess::process_file(input, output_dir);
        if !report.is_success() {
            failed += 1;
        }
        match report.status {
            CleaningStatus::Success {
                initial_rows,
                final_rows,
                rows_removed,
                output,
            } => {
                println!(
                    "   ✅ {}: {} -> {} rows ({} removed), saved to {}",
                    report.bank,
                    initial_rows,
                    final_rows,
                    rows_removed,
                    output.display()
                );
            }
            CleaningStatus::Failed { reason } => {
                error!("Cleaning {} failed: {}", report.bank, reason);
                println!("   ❌ {}: {}", report.bank, reason);
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} files could not be cleaned", failed, inputs.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape { apps } => {
            let config = load_config(cli.config)?;
            scrape(config, apps).await?;
        }
        Commands::Clean { input, output_dir } => {
            clean(&input, &output_dir)?;
        }
        Commands::CheckConfig => {
            let config = load_config(cli.config)?;
            println!("✅ Configuration is valid");
            for app in &config.apps {
                println!("   - {} ({}): {}", app.name, app.id, app.languages.join(", "));
            }
        }
    }
    Ok(())
}
