use crate::cache::ArticleCache;
use crate::types::Article;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::info;

/// What survived the time window and dedup pass, with the reasons for drops.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub admitted: Vec<Article>,
    /// Window actually applied, after incremental widening.
    pub window_hours: i64,
    pub cutoff: DateTime<Utc>,
    pub stale: usize,
    pub cached: usize,
    pub duplicates: usize,
    pub unlinked: usize,
    /// Links seen for the first time in this run.
    pub newly_recorded: usize,
}

/// Widen `configured` to cover the gap since `last_run` when the gap is longer.
pub fn effective_window(configured: i64, last_run: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    let Some(last_run) = last_run else {
        return configured;
    };
    let gap_hours = (now - last_run).num_seconds() as f64 / 3600.0;
    info!("Incremental mode: last run {:.1}h ago", gap_hours);
    if gap_hours > configured as f64 {
        let widened = gap_hours.trunc() as i64 + 1;
        info!("Adjusted time window to {}h", widened);
        widened
    } else {
        configured
    }
}

pub fn cutoff_for(window_hours: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(window_hours)
}

/// Keep articles published at or after the cutoff, one per link.
///
/// Every admitted link is recorded in the cache (insert-if-absent). In
/// incremental mode links the cache already knew are excluded first.
pub async fn filter_articles(
    articles: Vec<Article>,
    window_hours: i64,
    now: DateTime<Utc>,
    incremental: bool,
    cache: &dyn ArticleCache,
) -> FilterOutcome {
    let cutoff = cutoff_for(window_hours, now);
    let mut seen = HashSet::new();
    let mut outcome = FilterOutcome {
        admitted: Vec::new(),
        window_hours,
        cutoff,
        stale: 0,
        cached: 0,
        duplicates: 0,
        unlinked: 0,
        newly_recorded: 0,
    };

    for article in articles {
        if article.link.trim().is_empty() {
            outcome.unlinked += 1;
            continue;
        }
        if article.published_at < cutoff {
            outcome.stale += 1;
            continue;
        }
        if !seen.insert(article.link.clone()) {
            outcome.duplicates += 1;
            continue;
        }
        if incremental && cache.exists(&article.link).await {
            outcome.cached += 1;
            continue;
        }
        if cache.record(&article).await {
            outcome.newly_recorded += 1;
        }
        outcome.admitted.push(article);
    }

    if incremental {
        info!(
            "Found {} articles ({} new, {} cached)",
            outcome.admitted.len(),
            outcome.newly_recorded,
            outcome.cached
        );
    } else {
        info!(
            "Filtered to {} articles from last {}h ({} stale, {} duplicate)",
            outcome.admitted.len(),
            window_hours,
            outcome.stale,
            outcome.duplicates
        );
    }
    outcome
}
