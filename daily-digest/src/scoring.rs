use crate::config::LlmConfig;
use crate::llm_adapter::{parse_json_response, CompletionClient};
use crate::parser::truncate_chars;
use crate::types::{Article, Category, Result, ScoreBreakdown, ScoredArticle};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

/// Characters of each description included in a scoring prompt.
const PROMPT_DESCRIPTION_CHARS: usize = 300;
const MAX_KEYWORDS: usize = 4;

#[derive(Debug, Deserialize)]
struct ScoringResponse {
    #[serde(default)]
    results: Vec<ScoringResult>,
}

#[derive(Debug, Deserialize)]
struct ScoringResult {
    index: usize,
    scores: RawScores,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawScores {
    relevance: f64,
    quality: f64,
    timeliness: f64,
}

/// Scored articles in admission order, plus how many batches were lost.
#[derive(Debug, Clone, Default)]
pub struct ScoringReport {
    pub scored: Vec<ScoredArticle>,
    pub total_batches: usize,
    pub failed_batches: usize,
}

pub fn build_scoring_prompt(batch: &[Article]) -> String {
    let listing = batch
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "Index {}: [{}] {}\n{}",
                i,
                a.source_name,
                a.title,
                truncate_chars(&a.description, PROMPT_DESCRIPTION_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        r#"You are a technology curator selecting articles for a daily digest read by engineers.

Rate every article below on three independent dimensions, each an integer from 1 to 10 (10 is best), assign exactly one category, and extract 2-4 keywords.

## Dimensions
- relevance: value to people working in software, AI, or the internet industry
- quality: depth, originality, and writing quality of the piece itself
- timeliness: how worthwhile it is to read right now

## Categories (pick one)
- ai-ml: AI, machine learning, LLMs, deep learning
- security: security, privacy, vulnerabilities, cryptography
- engineering: software engineering, architecture, languages, systems design
- tools: developer tools, open source projects, new libraries or frameworks
- opinion: industry commentary, personal essays, careers, culture
- other: anything that fits none of the above

## Keywords
2-4 short English keywords that capture the topic, e.g. "Rust", "LLM", "database".

## Articles

{listing}

Reply with JSON only, no code fence and no other text:
{{
  "results": [
    {{
      "index": 0,
      "scores": {{"relevance": 8, "quality": 7, "timeliness": 9}},
      "category": "ai-ml",
      "keywords": ["LLM", "fine-tuning"]
    }}
  ]
}}"#
    )
}

fn rating(value: f64) -> u8 {
    if value.is_nan() {
        return 1;
    }
    value.round().clamp(1.0, 10.0) as u8
}

/// Map one parsed response onto its batch. Entries with an index outside the
/// batch are ignored; a repeated index keeps its first entry.
fn apply_results(batch: &[Article], response: ScoringResponse) -> Vec<ScoredArticle> {
    let mut results = response.results;
    results.sort_by_key(|r| r.index);
    results.dedup_by_key(|r| r.index);

    results
        .into_iter()
        .filter_map(|result| {
            let article = batch.get(result.index)?;
            let breakdown = ScoreBreakdown::new(
                rating(result.scores.relevance),
                rating(result.scores.quality),
                rating(result.scores.timeliness),
            );
            let category = result
                .category
                .as_deref()
                .map(Category::from_label)
                .unwrap_or_default();
            let keywords = result
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .take(MAX_KEYWORDS)
                .collect();
            Some(ScoredArticle::new(article.clone(), breakdown, category, keywords))
        })
        .collect()
}

async fn score_batch(client: &dyn CompletionClient, batch: &[Article]) -> Result<Vec<ScoredArticle>> {
    let prompt = build_scoring_prompt(batch);
    let reply = client.complete(&prompt).await?;
    let response: ScoringResponse = parse_json_response(&reply)?;
    Ok(apply_results(batch, response))
}

/// Score `articles` in fixed-size batches with a cap on in-flight requests.
///
/// A batch whose call or parse fails is dropped whole; the others are kept
/// in their original order.
pub async fn score_articles(articles: &[Article], client: &dyn CompletionClient, config: &LlmConfig) -> ScoringReport {
    let batch_size = config.batch_size.max(1);
    let total_batches = articles.len().div_ceil(batch_size);

    let outcomes: Vec<Result<Vec<ScoredArticle>>> = stream::iter(articles.chunks(batch_size).enumerate())
        .map(|(i, batch)| async move {
            info!("Scoring batch {}/{}...", i + 1, total_batches);
            score_batch(client, batch).await
        })
        .buffered(config.max_concurrent.max(1))
        .collect()
        .await;

    let mut report = ScoringReport {
        total_batches,
        ..Default::default()
    };
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(scored) => report.scored.extend(scored),
            Err(e) => {
                report.failed_batches += 1;
                warn!(kind = "scoring_batch_failed", "Scoring batch {}/{} failed: {}", i + 1, total_batches, e);
            }
        }
    }

    info!(
        "Scored {}/{} articles ({} of {} batches failed)",
        report.scored.len(),
        articles.len(),
        report.failed_batches,
        total_batches
    );
    report
}
