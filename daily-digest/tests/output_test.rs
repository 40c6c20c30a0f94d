use chrono::NaiveDate;
use daily_digest::output::default_file_name;
use daily_digest::FileSink;
use interfaces::{DigestArtifact, DigestSink};
use tempfile::TempDir;

#[test]
fn test_default_file_name() {
    let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    assert_eq!(default_file_name(date), "ai-daily-digest-2026-10-18.md");
}

#[tokio::test]
async fn test_file_sink_writes_markdown() {
    let dir = TempDir::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let sink = FileSink::in_dir(&dir.path().join("nested"), date);
    let artifact = DigestArtifact::new("技术日报 | 2026年10月18日".to_string(), "# 🚀 技术日报\n".to_string());

    let delivery = sink.deliver(&artifact).await.unwrap();

    let expected = dir.path().join("nested").join("ai-daily-digest-2026-10-18.md");
    assert_eq!(sink.path(), expected.as_path());
    assert_eq!(delivery.location, expected.display().to_string());
    assert_eq!(std::fs::read_to_string(&expected).unwrap(), "# 🚀 技术日报\n");
}

#[tokio::test]
async fn test_explicit_path_overwrites() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("digest.md");
    std::fs::write(&path, "old").unwrap();

    let sink = FileSink::at(&path);
    assert_eq!(sink.sink_name(), "file");
    sink.deliver(&DigestArtifact::new("t".to_string(), "new".to_string()))
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
}
