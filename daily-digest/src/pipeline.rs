use crate::cache::ArticleCache;
use crate::config::DigestConfig;
use crate::digest::{digest_title, render, DigestInput};
use crate::fetcher::Fetcher;
use crate::filter::{effective_window, filter_articles};
use crate::llm_adapter::CompletionClient;
use crate::ranker::{rank, top_n};
use crate::registry::FeedRegistry;
use crate::scoring::score_articles;
use crate::summarizer::summarize;
use crate::trends::analyze_trends;
use crate::types::{DigestError, Enrichment, FetchOutcome, Result, RunRecord, ScoredArticle};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use interfaces::DigestArtifact;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_NO_ARTICLES: &str = "no_articles";

/// Result of one successful run.
#[derive(Debug, Clone)]
pub struct DigestRun {
    pub run_id: Uuid,
    /// Reference time of the run; stamped on its run record.
    pub started_at: DateTime<Utc>,
    pub title: String,
    pub markdown: String,
    pub generated_at: NaiveDateTime,
    pub window_hours: i64,
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub fetched: usize,
    pub admitted: usize,
    pub failed_batches: usize,
    pub ranked: Vec<ScoredArticle>,
    pub summaries: Enrichment,
    pub trends: Enrichment,
}

impl DigestRun {
    pub fn artifact(&self) -> DigestArtifact {
        DigestArtifact::new(self.title.clone(), self.markdown.clone())
    }
}

/// Registry → fetch → filter → score → rank → summarize → trends → render.
pub struct DigestPipeline {
    config: DigestConfig,
    registry: FeedRegistry,
    fetcher: Fetcher,
    client: Arc<dyn CompletionClient>,
    cache: Arc<dyn ArticleCache>,
}

impl DigestPipeline {
    pub fn new(
        config: DigestConfig,
        registry: FeedRegistry,
        client: Arc<dyn CompletionClient>,
        cache: Arc<dyn ArticleCache>,
    ) -> Result<Self> {
        let fetcher = Fetcher::new(&config.fetch)?;
        Ok(Self {
            config,
            registry,
            fetcher,
            client,
            cache,
        })
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<DigestRun> {
        self.run_at(Utc::now()).await
    }

    /// Run with `now` as the reference point for the time window and stamps.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<DigestRun> {
        let run_id = Uuid::new_v4();
        let config = &self.config;
        info!(
            "Starting digest run {} with {} via {}",
            run_id,
            self.registry.len(),
            self.client.adapter_name()
        );

        let window_hours = if config.incremental {
            effective_window(config.window_hours, self.cache.last_run_timestamp().await, now)
        } else {
            config.window_hours
        };

        info!("Step 1/5: Fetching RSS feeds...");
        let fetches = self.fetcher.fetch_all(&self.registry).await;
        let sources_ok = fetches
            .iter()
            .filter(|f| matches!(f.outcome, FetchOutcome::Fetched { .. }))
            .count();
        let sources_failed = fetches.len() - sources_ok;
        let articles: Vec<_> = fetches.into_iter().flat_map(|f| f.into_articles()).collect();
        let fetched = articles.len();

        if articles.is_empty() {
            error!("No articles fetched from {} sources", self.registry.len());
            self.record_run(run_id, now, 0, STATUS_NO_ARTICLES).await;
            return Err(DigestError::NoArticlesFetched);
        }

        info!("Step 2/5: Filtering by time window and cache...");
        let filtered = filter_articles(articles, window_hours, now, config.incremental, self.cache.as_ref()).await;
        if filtered.admitted.is_empty() {
            error!("No recent articles in the last {}h. Try increasing --hours.", window_hours);
            return Err(DigestError::NoRecentArticles { hours: window_hours });
        }
        let admitted = filtered.admitted.len();

        info!("Step 3/5: AI scoring {} articles...", admitted);
        let report = score_articles(&filtered.admitted, self.client.as_ref(), &config.llm).await;
        if report.scored.is_empty() {
            error!("Scoring produced no results ({} batches failed)", report.failed_batches);
            return Err(DigestError::NothingScored);
        }

        info!("Step 4/5: Generating summaries...");
        let mut ranked = rank(report.scored);
        let selected = config.top_n.min(ranked.len());
        let summaries = summarize(&mut ranked[..selected], self.client.as_ref(), config.language).await;

        info!("Step 5/5: Analyzing trends...");
        let trends = analyze_trends(top_n(&ranked, selected), self.client.as_ref(), config.language).await;

        let generated_at = now.with_timezone(&Local).naive_local();
        let markdown = render(&DigestInput {
            ranked: &ranked,
            top_n: config.top_n,
            trends: &trends.text,
            window_hours,
            source_count: self.registry.len(),
            language: config.language,
            generated_at,
        });

        info!(
            "Done: {} articles scored, top {} included",
            ranked.len(),
            selected
        );

        Ok(DigestRun {
            run_id,
            started_at: now,
            title: digest_title(config.language, &generated_at),
            markdown,
            generated_at,
            window_hours,
            sources_ok,
            sources_failed,
            fetched,
            admitted,
            failed_batches: report.failed_batches,
            ranked,
            summaries,
            trends: trends.status,
        })
    }

    /// Append the `success` record for `run`. Call once the digest has been
    /// delivered, so incremental windows only count runs that produced output.
    pub async fn record_delivered(&self, run: &DigestRun) {
        self.record_run(run.run_id, run.started_at, run.ranked.len() as i64, STATUS_SUCCESS)
            .await;
    }

    async fn record_run(&self, run_id: Uuid, timestamp: DateTime<Utc>, article_count: i64, status: &str) {
        self.cache
            .record_run(&RunRecord {
                run_id,
                timestamp,
                article_count,
                status: status.to_string(),
            })
            .await;
    }
}
