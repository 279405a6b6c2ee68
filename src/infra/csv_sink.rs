//! Tabular (CSV) persistence of normalized reviews.
//!
//! Columns follow [`BASE_COLUMNS`], optionally followed by [`EMOJI_COLUMNS`].
//! List-valued emoji columns hold a JSON array so they survive a round trip.

use crate::constants::{BASE_COLUMNS, EMOJI_COLUMNS};
use crate::error::{Result, ScraperError};
use crate::storage::ReviewSink;
use crate::types::NormalizedReview;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes each destination as a CSV file under `directory`
pub struct CsvFileSink {
    directory: PathBuf,
    include_emoji: bool,
    utf8_bom: bool,
}

impl CsvFileSink {
    pub fn new(directory: impl Into<PathBuf>, include_emoji: bool, utf8_bom: bool) -> Self {
        Self {
            directory: directory.into(),
            include_emoji,
            utf8_bom,
        }
    }

    fn write_file(&self, records: &[NormalizedReview], path: &Path) -> Result<()> {
        fs::create_dir_all(&self.directory)?;
        let mut file = BufWriter::new(File::create(path)?);
        if self.utf8_bom {
            file.write_all(UTF8_BOM)?;
        }
        write_reviews(&mut file, records, self.include_emoji)?;
        file.flush()?;
        Ok(())
    }
}

#[async_trait]
impl ReviewSink for CsvFileSink {
    async fn write(&self, records: &[NormalizedReview], destination: &str) -> Result<String> {
        let path = self.directory.join(destination);
        let shown = path.display().to_string();
        self.write_file(records, &path)
            .map_err(|e| ScraperError::sink_write(&shown, e.to_string()))?;
        info!("💾 Saved {} reviews to {}", records.len(), shown);
        Ok(shown)
    }
}

/// Serialize reviews as CSV with a header row
pub fn write_reviews<W: io::Write>(writer: W, records: &[NormalizedReview], include_emoji: bool) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = BASE_COLUMNS.to_vec();
    if include_emoji {
        header.extend(EMOJI_COLUMNS);
    }
    csv_writer.write_record(&header)?;

    for record in records {
        csv_writer.write_record(to_row(record, include_emoji)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn to_row(review: &NormalizedReview, include_emoji: bool) -> Result<Vec<String>> {
    let mut row = vec![
        review.review_id.clone(),
        review.source_app.clone(),
        review.app_identifier.clone(),
        review.review_text.clone(),
        review.review_text_clean.clone(),
        review.rating.to_string(),
        review.review_date.clone(),
        review.thumbs_up.to_string(),
        review.language.clone(),
        review.scrape_timestamp.clone(),
        review.translated_text.clone(),
        review.is_translated.to_string(),
    ];
    if include_emoji {
        row.push(serde_json::to_string(&review.emojis)?);
        row.push(review.emoji_count.to_string());
        row.push(serde_json::to_string(&review.emoji_descriptions)?);
    }
    Ok(row)
}

/// Read a CSV written by [`write_reviews`]; emoji columns are optional
pub fn read_reviews(path: &Path) -> Result<Vec<NormalizedReview>> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim_start_matches('\u{feff}').to_string(), i))
        .collect();

    let missing: Vec<&str> = BASE_COLUMNS
        .iter()
        .copied()
        .filter(|c| !columns.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(ScraperError::MissingField(format!(
            "columns {} in {}",
            missing.join(", "),
            path.display()
        )));
    }

    let mut reviews = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let get = |name: &str| cell(&row, &columns, name);
        let invalid = |name: &str| ScraperError::InvalidData(format!("row {}: bad {}", line + 1, name));

        let emojis = parse_list(get("emojis")).map_err(|_| invalid("emojis"))?;
        let emoji_descriptions = parse_list(get("emoji_descriptions")).map_err(|_| invalid("emoji_descriptions"))?;
        let emoji_count = match get("emoji_count") {
            "" => emojis.len(),
            n => n.parse().map_err(|_| invalid("emoji_count"))?,
        };

        reviews.push(NormalizedReview {
            review_id: get("review_id").to_string(),
            source_app: get("bank").to_string(),
            app_identifier: get("app_id").to_string(),
            review_text: get("review").to_string(),
            review_text_clean: get("review_clean").to_string(),
            rating: get("rating").parse().map_err(|_| invalid("rating"))?,
            review_date: get("date").to_string(),
            thumbs_up: get("thumbs_up").parse().map_err(|_| invalid("thumbs_up"))?,
            language: get("language").to_string(),
            scrape_timestamp: get("scrape_timestamp").to_string(),
            translated_text: get("translated_review").to_string(),
            is_translated: parse_bool(get("is_translated")).ok_or_else(|| invalid("is_translated"))?,
            emojis,
            emoji_count,
            emoji_descriptions,
        });
    }
    Ok(reviews)
}

fn cell<'r>(row: &'r csv::StringRecord, columns: &HashMap<String, usize>, name: &str) -> &'r str {
    columns.get(name).and_then(|i| row.get(*i)).unwrap_or("")
}

fn parse_list(cell: &str) -> serde_json::Result<Vec<String>> {
    if cell.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(cell)
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review() -> NormalizedReview {
        NormalizedReview {
            review_id: "gp:1".into(),
            source_app: "CBE".into(),
            app_identifier: "com.combanketh.mobilebanking".into(),
            review_text: "Works, \"mostly\" 👍".into(),
            review_text_clean: "Works, \"mostly\"".into(),
            rating: 4,
            review_date: "2024-06-01".into(),
            thumbs_up: 2,
            language: "en".into(),
            scrape_timestamp: "2024-06-02 08:00:00".into(),
            translated_text: "Works, \"mostly\" 👍".into(),
            is_translated: false,
            emojis: vec!["👍".into()],
            emoji_count: 1,
            emoji_descriptions: vec![":thumbs_up:".into()],
        }
    }

    #[test]
    fn test_header_without_emoji_columns() {
        let mut out = Vec::new();
        write_reviews(&mut out, &[review()], false).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, BASE_COLUMNS.join(","));
    }

    #[test]
    fn test_header_with_emoji_columns() {
        let mut out = Vec::new();
        write_reviews(&mut out, &[review()], true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().next().unwrap().ends_with("emojis,emoji_count,emoji_descriptions"));
        assert!(text.contains(r#""[""👍""]""#));
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("false"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
