//! Cleaning pass over review CSVs produced by a scrape.
//!
//! Reduces a dataset to review, rating, date, bank and source columns after
//! dropping duplicate ids, blank reviews and out-of-range ratings.

use crate::app::normalize_use_case::parse_date_str;
use crate::constants::{CLEANED_COLUMNS, CLEANING_REQUIRED_COLUMNS, REVIEW_DATE_FORMAT, SOURCE_LABEL};
use crate::error::{Result, ScraperError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Input columns the cleaning step reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    pub review_id: String,
    pub review: Option<String>,
    pub rating: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedReview {
    pub review: String,
    pub rating: u8,
    pub date: String,
    pub bank: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleaningStatus {
    Success {
        initial_rows: usize,
        final_rows: usize,
        rows_removed: usize,
        output: PathBuf,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningReport {
    pub bank: String,
    pub status: CleaningStatus,
}

impl CleaningReport {
    pub fn is_success(&self) -> bool {
        matches!(self.status, CleaningStatus::Success { .. })
    }
}

/// Trimmed text; missing text becomes empty
pub fn clean_text(text: Option<&str>) -> String {
    text.map(str::trim).unwrap_or_default().to_string()
}

/// Bank label taken from the last `_`-separated part of a file stem
pub fn bank_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.rsplit('_').next())
        .unwrap_or_default()
        .to_string()
}

/// Apply the cleaning rules to rows of one bank, preserving order
pub fn clean_rows(rows: Vec<InputRow>, bank: &str) -> Vec<CleanedReview> {
    let mut seen = HashSet::new();
    let bank = bank.to_uppercase();

    rows.into_iter()
        .filter(|row| seen.insert(row.review_id.clone()))
        .filter_map(|row| {
            let review = clean_text(row.review.as_deref());
            if review.is_empty() {
                return None;
            }
            let rating = row.rating.trim().parse::<f64>().ok()?;
            if !(1.0..=5.0).contains(&rating) {
                return None;
            }
            let date = parse_date_str(row.date.trim())
                .map(|d| d.format(REVIEW_DATE_FORMAT).to_string())
                .unwrap_or_default();
            Some(CleanedReview {
                review,
                rating: rating.trunc() as u8,
                date,
                bank: bank.clone(),
                source: SOURCE_LABEL.to_string(),
            })
        })
        .collect()
}

/// Read the cleaning input columns from a CSV file
pub fn load_rows(path: &Path) -> Result<Vec<InputRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim_start_matches('\u{feff}').to_string(), i))
        .collect();

    let missing: Vec<&str> = CLEANING_REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(ScraperError::MissingField(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let get = |name: &str| columns.get(name).and_then(|i| record.get(*i)).map(str::to_string);
        rows.push(InputRow {
            review_id: get("review_id").unwrap_or_default(),
            review: get("review").filter(|r| !r.is_empty()),
            rating: get("rating").unwrap_or_default(),
            date: get("date").unwrap_or_default(),
        });
    }
    Ok(rows)
}

fn save_rows(rows: &[CleanedReview], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(output)?;
    if rows.is_empty() {
        writer.write_record(CLEANED_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Clean one bank's file into `output_dir/cleaned_<file name>`
pub fn process_file(input: &Path, output_dir: &Path) -> CleaningReport {
    let bank = bank_from_path(input).to_uppercase();
    info!("Processing {}...", bank);

    let rows = match load_rows(input) {
        Ok(rows) => rows,
        Err(e) => {
            error!("Error loading {}: {}", input.display(), e);
            return CleaningReport {
                bank,
                status: CleaningStatus::Failed {
                    reason: format!("load_error: {e}"),
                },
            };
        }
    };

    let initial_rows = rows.len();
    let cleaned = clean_rows(rows, &bank);
    let final_rows = cleaned.len();

    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("{bank}.csv"));
    let output = output_dir.join(format!("cleaned_{file_name}"));

    match save_rows(&cleaned, &output) {
        Ok(()) => CleaningReport {
            bank,
            status: CleaningStatus::Success {
                initial_rows,
                final_rows,
                rows_removed: initial_rows - final_rows,
                output,
            },
        },
        Err(e) => {
            error!("Error saving to {}: {}", output.display(), e);
            CleaningReport {
                bank,
                status: CleaningStatus::Failed {
                    reason: format!("save_error: {e}"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, review: Option<&str>, rating: &str, date: &str) -> InputRow {
        InputRow {
            review_id: id.into(),
            review: review.map(str::to_string),
            rating: rating.into(),
            date: date.into(),
        }
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  Hello  ")), "Hello");
        assert_eq!(clean_text(None), "");
        assert_eq!(clean_text(Some("")), "");
    }

    #[test]
    fn test_clean_rows_filters() {
        let rows = vec![
            row("1", Some("Great!"), "5", "2025-01-01"),
            row("2", Some("   "), "3", "2025-01-02"),
            row("3", Some("Bad"), "6", "invalid"),
            row("4", None, "4", "2025-01-03"),
            row("5", Some("Slow login"), "2", "garbage"),
            row("1", Some("Duplicate id"), "4", "2025-01-04"),
            row("6", Some("Fine"), "n/a", "2025-01-05"),
        ];
        let cleaned = clean_rows(rows, "test");
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].review, "Great!");
        assert_eq!(cleaned[0].bank, "TEST");
        assert_eq!(cleaned[0].source, SOURCE_LABEL);
        assert_eq!(cleaned[1].review, "Slow login");
        assert_eq!(cleaned[1].date, "");
    }

    #[test]
    fn test_bank_from_path() {
        assert_eq!(bank_from_path(Path::new("data/bank_reviews_dashen.csv")), "dashen");
        assert_eq!(bank_from_path(Path::new("boa.csv")), "boa");
    }
}
