use crate::types::{Article, CacheRecord, Result, RunRecord};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Persisted record of seen links and run history.
///
/// Every operation fails soft: a storage problem reads as "not cached" or
/// "no prior run" and is logged, never surfaced to the pipeline.
#[async_trait]
pub trait ArticleCache: Send + Sync {
    async fn exists(&self, link: &str) -> bool;

    /// Insert-if-absent. Returns true when the link was not known before.
    async fn record(&self, article: &Article) -> bool;

    async fn lookup(&self, link: &str) -> Option<CacheRecord>;

    /// Timestamp of the most recently appended run record.
    async fn last_run_timestamp(&self) -> Option<DateTime<Utc>>;

    async fn record_run(&self, run: &RunRecord);

    /// Delete article and run records first seen before `cutoff`.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> u64;

    async fn purge(&self, older_than_days: i64) -> u64 {
        self.purge_before(Utc::now() - Duration::days(older_than_days)).await
    }
}

/// Stand-in used with `--no-cache`: nothing is ever known or stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl ArticleCache for NoopCache {
    async fn exists(&self, _link: &str) -> bool {
        false
    }

    async fn record(&self, _article: &Article) -> bool {
        true
    }

    async fn lookup(&self, _link: &str) -> Option<CacheRecord> {
        None
    }

    async fn last_run_timestamp(&self) -> Option<DateTime<Utc>> {
        None
    }

    async fn record_run(&self, _run: &RunRecord) {}

    async fn purge_before(&self, _cutoff: DateTime<Utc>) -> u64 {
        0
    }
}

pub struct SqliteCache {
    db: SqlitePool,
}

impl SqliteCache {
    /// Open (creating if needed) the database file and its tables.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        // Single writer: one pipeline instance at a time.
        let db = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;

        let cache = Self { db };
        cache.init_schema().await?;
        debug!("Opened article cache at {}", path.display());
        Ok(cache)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                link TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                source TEXT NOT NULL,
                published_at INTEGER NOT NULL,
                first_seen INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                article_count INTEGER NOT NULL,
                status TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn try_exists(&self, link: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE link = ?1")
            .bind(link)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.is_some())
    }

    async fn try_record(&self, article: &Article) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO articles (link, title, source, published_at, first_seen)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&article.link)
        .bind(&article.title)
        .bind(&article.source_name)
        .bind(article.published_at.timestamp_millis())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn try_lookup(&self, link: &str) -> Result<Option<CacheRecord>> {
        let row = sqlx::query("SELECT link, title, source, published_at, first_seen FROM articles WHERE link = ?1")
            .bind(link)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|row| CacheRecord {
            link: row.get("link"),
            title: row.get("title"),
            source: row.get("source"),
            published_at: from_millis(row.get("published_at")),
            first_seen: from_millis(row.get("first_seen")),
        }))
    }

    async fn try_last_run(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT timestamp FROM runs ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|row| from_millis(row.get("timestamp"))))
    }

    async fn try_record_run(&self, run: &RunRecord) -> Result<()> {
        sqlx::query("INSERT INTO runs (run_id, timestamp, article_count, status) VALUES (?1, ?2, ?3, ?4)")
            .bind(run.run_id.to_string())
            .bind(run.timestamp.timestamp_millis())
            .bind(run.article_count)
            .bind(&run.status)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn try_purge(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let cutoff = cutoff.timestamp_millis();
        let articles = sqlx::query("DELETE FROM articles WHERE first_seen < ?1")
            .bind(cutoff)
            .execute(&self.db)
            .await?
            .rows_affected();
        let runs = sqlx::query("DELETE FROM runs WHERE timestamp < ?1")
            .bind(cutoff)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(articles + runs)
    }

    /// All run records, oldest first.
    pub async fn runs(&self) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query("SELECT run_id, timestamp, article_count, status FROM runs ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let run_id: String = row.get("run_id");
                RunRecord {
                    run_id: Uuid::parse_str(&run_id).unwrap_or_else(|_| Uuid::nil()),
                    timestamp: from_millis(row.get("timestamp")),
                    article_count: row.get("article_count"),
                    status: row.get("status"),
                }
            })
            .collect())
    }

    pub async fn article_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM articles")
            .fetch_one(&self.db)
            .await?;
        Ok(row.get("count"))
    }
}

#[async_trait]
impl ArticleCache for SqliteCache {
    async fn exists(&self, link: &str) -> bool {
        self.try_exists(link).await.unwrap_or_else(|e| {
            warn!(kind = "cache_error", "Cache lookup failed for {}: {}", link, e);
            false
        })
    }

    async fn record(&self, article: &Article) -> bool {
        self.try_record(article).await.unwrap_or_else(|e| {
            warn!(kind = "cache_error", "Failed to cache {}: {}", article.link, e);
            false
        })
    }

    async fn lookup(&self, link: &str) -> Option<CacheRecord> {
        self.try_lookup(link).await.unwrap_or_else(|e| {
            warn!(kind = "cache_error", "Cache lookup failed for {}: {}", link, e);
            None
        })
    }

    async fn last_run_timestamp(&self) -> Option<DateTime<Utc>> {
        self.try_last_run().await.unwrap_or_else(|e| {
            warn!(kind = "cache_error", "Failed to read last run: {}", e);
            None
        })
    }

    async fn record_run(&self, run: &RunRecord) {
        if let Err(e) = self.try_record_run(run).await {
            warn!(kind = "cache_error", "Failed to record run {}: {}", run.run_id, e);
        }
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> u64 {
        match self.try_purge(cutoff).await {
            Ok(removed) => {
                info!("Purged {} cache records older than {}", removed, cutoff.format("%Y-%m-%d"));
                removed
            }
            Err(e) => {
                warn!(kind = "cache_error", "Cache purge failed: {}", e);
                0
            }
        }
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
