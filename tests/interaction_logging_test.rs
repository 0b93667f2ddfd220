// Integration tests for per-session interaction logs

use anyhow::Result;
use chatdesk::logging::{read_records, session_log_file_name, InteractionLogger, LogLevel};
use std::fs;
use tempfile::tempdir;

fn is_timestamp(s: &str) -> bool {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S,%3f").is_ok()
}

#[tokio::test]
async fn test_logger_creates_file_and_parent_dirs() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("nested").join("log").join("session.log");

    let _logger = InteractionLogger::open(&path)?;

    assert!(path.exists(), "Log file should be created");
    assert_eq!(fs::read_to_string(&path)?, "");
    Ok(())
}

#[tokio::test]
async fn test_record_line_format() -> Result<()> {
    let dir = tempdir()?;
    let logger = InteractionLogger::open(dir.path().join("a.log"))?;

    logger.info("User (abc) query: What is the wingspan of a Boeing 747?")?;
    logger.error("Error: backend went away")?;

    let records = logger.records()?;
    assert_eq!(records.len(), 2);

    let parts: Vec<&str> = records[0].splitn(3, " - ").collect();
    assert_eq!(parts.len(), 3);
    assert!(is_timestamp(parts[0]), "bad timestamp: {}", parts[0]);
    assert_eq!(parts[1], "INFO");
    assert_eq!(parts[2], "User (abc) query: What is the wingspan of a Boeing 747?");

    assert!(records[1].contains(" - ERROR - Error: backend went away"));
    Ok(())
}

#[tokio::test]
async fn test_log_is_append_only() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.log");
    let logger = InteractionLogger::open(&path)?;

    let mut previous = String::new();
    for i in 0..5 {
        logger.record(LogLevel::Info, &format!("record {}", i))?;
        let current = fs::read_to_string(&path)?;
        assert!(
            current.starts_with(&previous),
            "Earlier content must be preserved verbatim"
        );
        assert!(current.len() > previous.len());
        previous = current;
    }
    assert_eq!(read_records(&path)?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_reopen_appends_instead_of_truncating() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("a.log");

    {
        let logger = InteractionLogger::open(&path)?;
        logger.info("first")?;
    }
    let logger = InteractionLogger::open(&path)?;
    logger.info("second")?;

    let records = read_records(&path)?;
    assert_eq!(records.len(), 2);
    assert!(records[0].ends_with("first"));
    assert!(records[1].ends_with("second"));
    Ok(())
}

#[tokio::test]
async fn test_multiline_message_stays_one_record() -> Result<()> {
    let dir = tempdir()?;
    let logger = InteractionLogger::open(dir.path().join("a.log"))?;

    logger.info("line one\nline two\r\nline three")?;

    let records = logger.records()?;
    assert_eq!(records.len(), 1);
    assert!(records[0].ends_with("line one\\nline two\\r\\nline three"));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_records_do_not_interleave() -> Result<()> {
    let dir = tempdir()?;
    let logger = std::sync::Arc::new(InteractionLogger::open(dir.path().join("a.log"))?);

    let mut tasks = Vec::new();
    for i in 0..8 {
        let logger = logger.clone();
        tasks.push(tokio::spawn(async move {
            for j in 0..10 {
                logger.info(&format!("writer {} record {}", i, j)).unwrap();
            }
        }));
    }
    for task in tasks {
        task.await?;
    }

    let records = logger.records()?;
    assert_eq!(records.len(), 80);
    for record in records {
        assert!(record.contains(" - INFO - writer "), "torn record: {}", record);
    }
    Ok(())
}

#[test]
fn test_session_log_file_name() {
    let name = session_log_file_name("0123456789abcdef");
    assert!(name.starts_with("st_log_"));
    assert!(name.ends_with("_01234567.log"));
    // st_log_YYYYmmdd_HHMMSS_xxxxxxxx.log
    assert_eq!(name.len(), "st_log_".len() + 15 + 1 + 8 + ".log".len());
}
