use crate::config::Language;
use crate::llm_adapter::CompletionClient;
use crate::types::{Enrichment, ScoredArticle};
use tracing::{info, warn};

/// Articles considered when looking for trends.
pub const TREND_SAMPLE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendReport {
    pub text: String,
    pub status: Enrichment,
}

pub fn placeholder(language: Language) -> &'static str {
    match language {
        Language::Zh => "暂无趋势分析",
        Language::En => "No trend analysis available",
    }
}

pub fn build_trends_prompt(articles: &[ScoredArticle], language: Language) -> String {
    let listing = articles
        .iter()
        .take(TREND_SAMPLE)
        .map(|s| format!("- [{}] {}", s.category, s.display_title()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the following hand-picked technology articles of the day and identify 2-3 broad technology trends.

Requirements:
- describe each trend in 1-2 sentences
- point out what it means for the technology industry
- trends may cover technical directions, industry dynamics, or development practices
- write in {lang}

Articles:
{listing}

Reply with the trend list only:
1. First trend...
2. Second trend...
3. Third trend (if any)..."#,
        lang = language.prompt_name()
    )
}

/// One free-text request over the leading articles; a placeholder on failure.
pub async fn analyze_trends(articles: &[ScoredArticle], client: &dyn CompletionClient, language: Language) -> TrendReport {
    if articles.is_empty() {
        return TrendReport {
            text: placeholder(language).to_string(),
            status: Enrichment::Skipped,
        };
    }
    info!("Analyzing trends...");

    match client.complete(&build_trends_prompt(articles, language)).await {
        Ok(text) if !text.trim().is_empty() => TrendReport {
            text: text.trim().to_string(),
            status: Enrichment::Applied,
        },
        Ok(_) => {
            warn!(kind = "trends_failed", "Trend analysis returned no text");
            TrendReport {
                text: placeholder(language).to_string(),
                status: Enrichment::Failed,
            }
        }
        Err(e) => {
            warn!(kind = "trends_failed", "Trend analysis failed: {}", e);
            TrendReport {
                text: placeholder(language).to_string(),
                status: Enrichment::Failed,
            }
        }
    }
}
