use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum number of characters kept from an item description.
pub const DESCRIPTION_LIMIT: usize = 500;

/// Which TLS settings a source is fetched with.
///
/// Neither profile validates certificates or hostnames; feeds are content,
/// not trust boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsProfile {
    Standard,
    /// Lowered minimum protocol version for servers stuck on old TLS stacks.
    Legacy,
}

impl Default for TlsProfile {
    fn default() -> Self {
        TlsProfile::Standard
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub xml_url: String,
    pub html_url: String,
    pub fallback_urls: Vec<String>,
    pub tls_profile: Option<TlsProfile>,
}

impl FeedSource {
    pub fn new(name: &str, xml_url: &str, html_url: &str) -> Self {
        Self {
            name: name.to_string(),
            xml_url: xml_url.to_string(),
            html_url: html_url.to_string(),
            fallback_urls: Vec::new(),
            tls_profile: None,
        }
    }

    pub fn with_fallback(mut self, url: &str) -> Self {
        if !self.fallback_urls.iter().any(|u| u == url) && self.xml_url != url {
            self.fallback_urls.push(url.to_string());
        }
        self
    }

    pub fn with_tls_profile(mut self, profile: TlsProfile) -> Self {
        self.tls_profile = Some(profile);
        self
    }

    pub fn effective_tls_profile(&self) -> TlsProfile {
        self.tls_profile.unwrap_or_default()
    }
}

/// Raw fields recovered from one `<item>` or `<entry>`, before date parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// `DateTime::<Utc>::UNIX_EPOCH` when the feed date could not be parsed.
    pub published_at: DateTime<Utc>,
    pub description: String,
    pub source_name: String,
    pub source_url: String,
}

/// The fixed category set used for grouping. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ai-ml")]
    AiMl,
    #[serde(rename = "security")]
    Security,
    #[serde(rename = "engineering")]
    Engineering,
    #[serde(rename = "tools")]
    Tools,
    #[serde(rename = "opinion")]
    Opinion,
    #[serde(rename = "other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::AiMl,
        Category::Security,
        Category::Engineering,
        Category::Tools,
        Category::Opinion,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AiMl => "ai-ml",
            Category::Security => "security",
            Category::Engineering => "engineering",
            Category::Tools => "tools",
            Category::Opinion => "opinion",
            Category::Other => "other",
        }
    }

    /// Unknown labels fall into `Other`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == label)
            .unwrap_or(Category::Other)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::AiMl => "🤖",
            Category::Security => "🔒",
            Category::Engineering => "⚙️",
            Category::Tools => "🛠",
            Category::Opinion => "💡",
            Category::Other => "📝",
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three independent ratings, each clamped to 1..=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub relevance: u8,
    pub quality: u8,
    pub timeliness: u8,
}

impl ScoreBreakdown {
    pub fn new(relevance: u8, quality: u8, timeliness: u8) -> Self {
        Self {
            relevance: relevance.clamp(1, 10),
            quality: quality.clamp(1, 10),
            timeliness: timeliness.clamp(1, 10),
        }
    }

    /// Rounded mean of the three ratings, half-up.
    pub fn aggregate(&self) -> u8 {
        let sum = u32::from(self.relevance) + u32::from(self.quality) + u32::from(self.timeliness);
        // floor(sum / 3 + 1/2) in integer arithmetic
        ((2 * sum + 3) / 6) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    pub article: Article,
    pub breakdown: ScoreBreakdown,
    pub score: u8,
    pub category: Category,
    pub keywords: Vec<String>,
    pub title_localized: Option<String>,
    pub summary: Option<String>,
    pub reason: Option<String>,
}

impl ScoredArticle {
    pub fn new(article: Article, breakdown: ScoreBreakdown, category: Category, keywords: Vec<String>) -> Self {
        Self {
            article,
            score: breakdown.aggregate(),
            breakdown,
            category,
            keywords,
            title_localized: None,
            summary: None,
            reason: None,
        }
    }

    /// Localized title when the summarizer produced one, else the original.
    pub fn display_title(&self) -> &str {
        self.title_localized
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.article.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub link: String,
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub first_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub article_count: i64,
    pub status: String,
}

/// Why a source produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    Tls(String),
    RedirectExhausted { status: u16 },
    HttpStatus(u16),
    Other(String),
}

impl FetchFailure {
    /// Classification tag used in log lines.
    pub fn tag(&self) -> &'static str {
        match self {
            FetchFailure::Timeout => "timeout",
            FetchFailure::Tls(_) => "tls",
            FetchFailure::RedirectExhausted { .. } => "redirect_exhausted",
            FetchFailure::HttpStatus(_) => "http_status",
            FetchFailure::Other(_) => "other",
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "timeout"),
            FetchFailure::Tls(msg) => write!(f, "TLS error: {}", msg),
            FetchFailure::RedirectExhausted { status } => {
                write!(f, "redirect loop or permanent redirect (HTTP {})", status)
            }
            FetchFailure::HttpStatus(status) => write!(f, "HTTP {}", status),
            FetchFailure::Other(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fetched { url: String, articles: Vec<Article> },
    Failed(FetchFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFetch {
    pub source_name: String,
    pub outcome: FetchOutcome,
}

impl SourceFetch {
    pub fn articles(&self) -> &[Article] {
        match &self.outcome {
            FetchOutcome::Fetched { articles, .. } => articles,
            FetchOutcome::Failed(_) => &[],
        }
    }

    pub fn into_articles(self) -> Vec<Article> {
        match self.outcome {
            FetchOutcome::Fetched { articles, .. } => articles,
            FetchOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// Result of a best-effort enrichment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    Applied,
    Skipped,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No articles fetched from any source")]
    NoArticlesFetched,

    #[error("No articles left after filtering the last {hours}h")]
    NoRecentArticles { hours: i64 },

    #[error("Scoring produced no results")]
    NothingScored,
}

pub type Result<T> = std::result::Result<T, DigestError>;
