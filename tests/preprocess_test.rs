use anyhow::Result;
use bank_review_scraper::preprocess::{process_file, CleaningStatus};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_process_file_cleans_and_saves() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("bank_reviews_boa.csv");
    fs::write(
        &input,
        "review_id,bank,review,rating,date\n\
         a,BOA,  Good service  ,5,2024-02-01 08:00:00\n\
         b,BOA,,4,2024-02-02\n\
         a,BOA,Duplicate,3,2024-02-03\n\
         c,BOA,Too high,7,2024-02-04\n\
         d,BOA,Login fails,1,2024-02-05\n",
    )?;
    let out_dir = dir.path().join("cleaned");

    let report = process_file(&input, &out_dir);

    assert_eq!(report.bank, "BOA");
    assert!(report.is_success());
    let CleaningStatus::Success {
        initial_rows,
        final_rows,
        rows_removed,
        output,
    } = report.status
    else {
        panic!("expected success, got {:?}", report.status);
    };
    assert_eq!((initial_rows, final_rows, rows_removed), (5, 2, 3));
    assert_eq!(output, out_dir.join("cleaned_bank_reviews_boa.csv"));

    let content = fs::read_to_string(&output)?;
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("review,rating,date,bank,source"));
    assert_eq!(lines.next(), Some("Good service,5,2024-02-01,BOA,Google Play Store"));
    assert_eq!(lines.next(), Some("Login fails,1,2024-02-05,BOA,Google Play Store"));
    assert_eq!(lines.next(), None);
    Ok(())
}

#[test]
fn test_process_file_missing_columns() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("bank_reviews_cbe.csv");
    fs::write(&input, "review_id,review\n1,hello\n")?;

    let report = process_file(&input, dir.path());

    match report.status {
        CleaningStatus::Failed { reason } => {
            assert!(reason.starts_with("load_error"));
            assert!(reason.contains("rating"));
            assert!(reason.contains("date"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_process_file_unreadable_input() {
    let dir = tempdir().unwrap();
    let report = process_file(&dir.path().join("absent_dashen.csv"), dir.path());
    assert_eq!(report.bank, "DASHEN");
    assert!(!report.is_success());
    assert!(matches!(report.status, CleaningStatus::Failed { .. }));
}
