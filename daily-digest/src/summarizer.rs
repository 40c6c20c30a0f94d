use crate::config::Language;
use crate::llm_adapter::{parse_json_response, CompletionClient};
use crate::parser::truncate_chars;
use crate::types::{Enrichment, Result, ScoredArticle};
use serde::Deserialize;
use tracing::{info, warn};

const PROMPT_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    summaries: Vec<SummaryItem>,
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    index: usize,
    #[serde(rename = "titleZh", alias = "title", default)]
    title_localized: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

pub fn build_summary_prompt(articles: &[ScoredArticle], language: Language) -> String {
    let listing = articles
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "Index {}: [{}] {}\n{}",
                i,
                s.article.source_name,
                s.article.title,
                truncate_chars(&s.article.description, PROMPT_DESCRIPTION_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    let lang = language.prompt_name();

    format!(
        r#"You are a technology curator writing the entries of a daily digest for engineers.

For each article below produce, in {lang}:
1. a concise, accurate translated title
2. a structured summary of 4-6 sentences: the core problem or topic, the key arguments or findings, then the conclusion or impact
3. a one-sentence reason why an engineer should read it

## Articles

{listing}

Reply with JSON only, no code fence and no other text:
{{
  "summaries": [
    {{
      "index": 0,
      "titleZh": "translated title",
      "summary": "4-6 sentence summary...",
      "reason": "one-sentence reason"
    }}
  ]
}}"#
    )
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn request_summaries(
    articles: &[ScoredArticle],
    client: &dyn CompletionClient,
    language: Language,
) -> Result<SummaryResponse> {
    let reply = client.complete(&build_summary_prompt(articles, language)).await?;
    parse_json_response(&reply)
}

/// Fill localized title, summary and reason on `top` in one request.
///
/// Best effort: on failure the fields stay `None` and the run goes on.
pub async fn summarize(top: &mut [ScoredArticle], client: &dyn CompletionClient, language: Language) -> Enrichment {
    if top.is_empty() {
        return Enrichment::Skipped;
    }
    info!("Summarizing {} articles...", top.len());

    match request_summaries(top, client, language).await {
        Ok(response) => {
            let mut applied = 0;
            for item in response.summaries {
                let Some(target) = top.get_mut(item.index) else {
                    continue;
                };
                target.title_localized = non_blank(item.title_localized);
                target.summary = non_blank(item.summary);
                target.reason = non_blank(item.reason);
                applied += 1;
            }
            info!("Applied {} summaries", applied);
            Enrichment::Applied
        }
        Err(e) => {
            warn!(kind = "summarize_failed", "Summarization failed: {}", e);
            Enrichment::Failed
        }
    }
}
