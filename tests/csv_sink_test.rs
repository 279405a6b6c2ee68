use anyhow::Result;
use bank_review_scraper::infra::csv_sink::{read_reviews, CsvFileSink};
use bank_review_scraper::infra::json_sink::JsonFileSink;
use bank_review_scraper::storage::ReviewSink;
use bank_review_scraper::types::NormalizedReview;
use std::fs;
use tempfile::tempdir;

fn review(id: &str, text: &str, language: &str) -> NormalizedReview {
    NormalizedReview {
        review_id: id.to_string(),
        source_app: "Dashen".to_string(),
        app_identifier: "com.dashen.dashensuperapp".to_string(),
        review_text: text.to_string(),
        review_text_clean: text.replace(" 🙏", ""),
        rating: 5,
        review_date: "2024-03-09".to_string(),
        thumbs_up: 12,
        language: language.to_string(),
        scrape_timestamp: "2024-03-10 09:15:00".to_string(),
        translated_text: text.to_string(),
        is_translated: false,
        emojis: vec!["🙏".to_string()],
        emoji_count: 1,
        emoji_descriptions: vec![":folded_hands:".to_string()],
    }
}

#[tokio::test]
async fn test_csv_sink_writes_readable_file() -> Result<()> {
    let dir = tempdir()?;
    let sink = CsvFileSink::new(dir.path(), true, true);
    let records = vec![
        review("gp:1", "Fast, reliable \"super app\" 🙏", "en"),
        review("gp:2", "በጣም ጥሩ ነው 🙏", "am"),
    ];

    let location = sink.write(&records, "bank_reviews_dashen.csv").await?;
    assert!(location.ends_with("bank_reviews_dashen.csv"));

    let bytes = fs::read(dir.path().join("bank_reviews_dashen.csv"))?;
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));

    let read_back = read_reviews(&dir.path().join("bank_reviews_dashen.csv"))?;
    assert_eq!(read_back, records);
    Ok(())
}

#[tokio::test]
async fn test_csv_sink_without_emoji_columns() -> Result<()> {
    let dir = tempdir()?;
    let sink = CsvFileSink::new(dir.path(), false, false);
    sink.write(&[review("gp:1", "Nice 🙏", "en")], "out.csv").await?;

    let content = fs::read_to_string(dir.path().join("out.csv"))?;
    assert!(!content.contains("emoji_count"));

    let read_back = read_reviews(&dir.path().join("out.csv"))?;
    assert_eq!(read_back[0].review_text, "Nice 🙏");
    assert!(read_back[0].emojis.is_empty());
    assert_eq!(read_back[0].emoji_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_json_sink_replaces_extension() -> Result<()> {
    let dir = tempdir()?;
    let sink = JsonFileSink::new(dir.path());
    let location = sink.write(&[review("gp:1", "Nice 🙏", "en")], "bank_reviews_dashen.csv").await?;
    assert!(location.ends_with("bank_reviews_dashen.json"));

    let content = fs::read_to_string(dir.path().join("bank_reviews_dashen.json"))?;
    let parsed: Vec<NormalizedReview> = serde_json::from_str(&content)?;
    assert_eq!(parsed[0].review_id, "gp:1");
    assert!(content.contains("\"translated_review\""));
    Ok(())
}

#[test]
fn test_read_reviews_reports_missing_columns() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.csv");
    fs::write(&path, "review_id,review\n1,hello\n")?;

    let err = read_reviews(&path).unwrap_err();
    assert!(err.to_string().contains("rating"));
    Ok(())
}
