use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use daily_digest::config::LlmConfig;
use daily_digest::llm_adapter::{parse_json_response, strip_code_fence};
use daily_digest::scoring::{build_scoring_prompt, score_articles};
use daily_digest::{Article, Category, CompletionClient, DigestError, MockCompletionClient, ScoreBreakdown};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

fn articles(count: usize) -> Vec<Article> {
    (0..count)
        .map(|i| Article {
            title: format!("Article {}", i),
            link: format!("https://example.com/{}", i),
            published_at: Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap(),
            description: "A description".to_string(),
            source_name: "example.com".to_string(),
            source_url: "https://example.com".to_string(),
        })
        .collect()
}

fn batch_len(prompt: &str) -> usize {
    prompt.matches("\nIndex ").count()
}

/// Uniform ratings for every article in the batch.
fn uniform_reply(prompt: &str, ratings: (u8, u8, u8), category: &str) -> String {
    let results: Vec<String> = (0..batch_len(prompt))
        .map(|i| {
            format!(
                r#"{{"index": {}, "scores": {{"relevance": {}, "quality": {}, "timeliness": {}}}, "category": "{}", "keywords": ["Rust", "LLM"]}}"#,
                i, ratings.0, ratings.1, ratings.2, category
            )
        })
        .collect();
    format!(r#"{{"results": [{}]}}"#, results.join(","))
}

#[test]
fn test_aggregate_score_is_rounded_mean() {
    assert_eq!(ScoreBreakdown::new(8, 7, 9).aggregate(), 8);
    assert_eq!(ScoreBreakdown::new(1, 10, 10).aggregate(), 7);
    assert_eq!(ScoreBreakdown::new(5, 5, 6).aggregate(), 5);
    assert_eq!(ScoreBreakdown::new(0, 0, 0).aggregate(), 1, "ratings clamp to 1..=10");
}

#[test]
fn test_prompt_lists_each_article_once() {
    let prompt = build_scoring_prompt(&articles(3));
    assert_eq!(batch_len(&prompt), 3);
    assert!(prompt.contains("Index 2: [example.com] Article 2"));
    assert!(prompt.contains("\"results\""));
}

#[test]
fn test_json_response_tolerates_fences_and_prose() {
    assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    assert_eq!(strip_code_fence("  {}  "), "{}");

    let value: Value = parse_json_response("Sure! Here you go:\n{\"ok\": true}\nHope that helps").unwrap();
    assert_eq!(value["ok"], Value::Bool(true));

    let err = parse_json_response::<Value>("no json here").unwrap_err();
    assert!(matches!(err, DigestError::Serialization(_)));
}

#[tokio::test]
async fn test_scores_every_batch_in_order() {
    init_tracing();
    let client = MockCompletionClient::new("uniform", |prompt| Ok(uniform_reply(prompt, (8, 7, 9), "ai-ml")));
    let input = articles(25);
    let report = score_articles(&input, &client, &LlmConfig::default()).await;

    assert_eq!(client.calls(), 3, "25 articles make 3 batches of at most 10");
    assert_eq!(report.total_batches, 3);
    assert_eq!(report.failed_batches, 0);
    assert_eq!(report.scored.len(), 25);

    let links: Vec<_> = report.scored.iter().map(|s| s.article.link.clone()).collect();
    let expected: Vec<_> = input.iter().map(|a| a.link.clone()).collect();
    assert_eq!(links, expected);

    let first = &report.scored[0];
    assert_eq!(first.score, 8);
    assert_eq!(first.category, Category::AiMl);
    assert_eq!(first.keywords, vec!["Rust".to_string(), "LLM".to_string()]);
}

#[tokio::test]
async fn test_failed_batch_is_dropped_whole() {
    init_tracing();
    let client = MockCompletionClient::new("flaky", |prompt| {
        if prompt.contains("Article 12") {
            Err(DigestError::Llm("HTTP 503".to_string()))
        } else if prompt.contains("Article 22") {
            Ok("I'm sorry, I cannot rate these.".to_string())
        } else {
            Ok(format!("```json\n{}\n```", uniform_reply(prompt, (6, 6, 6), "tools")))
        }
    });
    let report = score_articles(&articles(25), &client, &LlmConfig::default()).await;

    assert_eq!(report.failed_batches, 2);
    assert_eq!(report.scored.len(), 10);
    let titles: Vec<_> = report.scored.iter().map(|s| s.article.title.clone()).collect();
    let expected: Vec<_> = (0..10).map(|i| format!("Article {}", i)).collect();
    assert_eq!(titles, expected, "only the first batch survives");
}

#[tokio::test]
async fn test_out_of_range_and_unknown_values_are_normalized() {
    let client = MockCompletionClient::new("sloppy", |_| {
        Ok(r#"{"results": [
            {"index": 1, "scores": {"relevance": 12, "quality": 0, "timeliness": 7.6}, "category": "quantum"},
            {"index": 0, "scores": {"relevance": 9, "quality": 9, "timeliness": 9}, "keywords": ["  ", "AI", "a", "b", "c", "d"]},
            {"index": 0, "scores": {"relevance": 1, "quality": 1, "timeliness": 1}, "category": "opinion"},
            {"index": 7, "scores": {"relevance": 9, "quality": 9, "timeliness": 9}, "category": "security"}
        ]}"#
        .to_string())
    });
    let report = score_articles(&articles(2), &client, &LlmConfig::default()).await;

    assert_eq!(report.scored.len(), 2, "index 7 is outside the batch");

    let zero = &report.scored[0];
    assert_eq!(zero.article.title, "Article 0");
    assert_eq!(zero.score, 9, "first entry for a repeated index wins");
    assert_eq!(zero.category, Category::Other, "missing category falls back");
    assert_eq!(zero.keywords, vec!["AI", "a", "b", "c"]);

    let one = &report.scored[1];
    assert_eq!(one.breakdown, ScoreBreakdown::new(10, 1, 8));
    assert_eq!(one.score, 6);
    assert_eq!(one.category, Category::Other);
}

/// Tracks how many completions run at the same time.
struct SlowClient {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl CompletionClient for SlowClient {
    fn adapter_name(&self) -> String {
        "slow".to_string()
    }

    async fn complete(&self, prompt: &str) -> daily_digest::Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(uniform_reply(prompt, (5, 5, 5), "engineering"))
    }
}

#[tokio::test]
async fn test_in_flight_requests_are_capped() {
    let client = SlowClient {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    };
    let config = LlmConfig {
        max_concurrent: 2,
        ..Default::default()
    };
    let report = score_articles(&articles(60), &client, &config).await;

    assert_eq!(report.scored.len(), 60);
    assert!(client.peak.load(Ordering::SeqCst) <= 2);
}
