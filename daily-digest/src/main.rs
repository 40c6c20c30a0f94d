use anyhow::Context;
use clap::Parser;
use daily_digest::config::{config_file_path, Language};
use daily_digest::{
    ArticleCache, ChatCompletionClient, DigestConfig, DigestPipeline, FeedRegistry, FileSink, NoopCache, SqliteCache,
};
use interfaces::DigestSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fetch ~90 tech blogs, rank the recent posts with an LLM, write a Markdown digest.
#[derive(Debug, Parser)]
#[command(name = "daily-digest", version, about)]
struct Args {
    /// Time window in hours
    #[arg(long)]
    hours: Option<i64>,

    /// Number of must-read articles
    #[arg(long = "top-n")]
    top_n: Option<usize>,

    /// Output language: zh or en
    #[arg(long)]
    lang: Option<String>,

    /// Output file path (default: ai-daily-digest-YYYY-MM-DD.md in the output directory)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// API key for the completion endpoint
    #[arg(long = "api-key")]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long)]
    gateway: Option<String>,

    /// Only process articles not seen by earlier runs
    #[arg(long)]
    incremental: bool,

    /// Disable the article cache
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Purge cache records past the retention period and exit
    #[arg(long = "clean-cache")]
    clean_cache: bool,

    /// Print the resolved configuration and exit
    #[arg(long = "show-config")]
    show_config: bool,
}

impl Args {
    fn apply(&self, config: &mut DigestConfig) -> anyhow::Result<()> {
        if let Some(hours) = self.hours {
            config.window_hours = hours;
        }
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        if let Some(lang) = &self.lang {
            config.language = Language::parse(lang).with_context(|| format!("unsupported language: {}", lang))?;
        }
        if let Some(path) = &self.output {
            config.output_path = Some(path.clone());
        }
        if let Some(key) = &self.api_key {
            config.llm.api_key = Some(key.clone());
        }
        if let Some(gateway) = &self.gateway {
            config.llm.endpoint = gateway.clone();
        }
        config.incremental = self.incremental;
        config.cache.enabled = !self.no_cache;
        Ok(())
    }
}

fn show_config(config: &DigestConfig) {
    let masked = config
        .llm
        .api_key
        .as_deref()
        .map(|k| {
            let tail: String = k.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            format!("****{}", tail)
        })
        .unwrap_or_else(|| "(not set)".to_string());

    println!("Config file:     {}", config_file_path().display());
    println!("API key:         {}", masked);
    println!("Endpoint:        {}", config.llm.endpoint);
    println!("Model:           {}", config.llm.model);
    println!("Window (hours):  {}", config.window_hours);
    println!("Top N:           {}", config.top_n);
    println!("Language:        {:?}", config.language);
    println!("Output dir:      {}", config.output_dir.display());
    println!("Cache:           {}", config.cache.database_path.display());
    println!("Cache retention: {} days", config.cache.retention_days);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = DigestConfig::load();
    args.apply(&mut config)?;

    if args.show_config {
        show_config(&config);
        return Ok(());
    }

    if args.clean_cache {
        let cache = SqliteCache::open(&config.cache.database_path).await?;
        let removed = cache.purge(config.cache.retention_days).await;
        info!("Removed {} cache records older than {} days", removed, config.cache.retention_days);
        return Ok(());
    }

    config.validate()?;

    let cache: Arc<dyn ArticleCache> = if config.cache.enabled {
        match SqliteCache::open(&config.cache.database_path).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                error!(kind = "cache_error", "Cache unavailable, continuing without it: {}", e);
                Arc::new(NoopCache)
            }
        }
    } else {
        Arc::new(NoopCache)
    };

    let client = Arc::new(ChatCompletionClient::new(&config.llm)?);
    let registry = FeedRegistry::builtin();
    let pipeline = DigestPipeline::new(config.clone(), registry, client, cache)?;

    let run = match pipeline.run().await {
        Ok(run) => run,
        Err(e) => {
            error!("Digest run failed: {}", e);
            return Err(e.into());
        }
    };

    let sink = match &config.output_path {
        Some(path) => FileSink::at(path.clone()),
        None => FileSink::in_dir(&config.output_dir, run.generated_at.date()),
    };
    let delivery = sink.deliver(&run.artifact()).await?;
    pipeline.record_delivered(&run).await;
    info!(
        "Done! {} ({} articles ranked, run {}) -> {}",
        run.title,
        run.ranked.len(),
        run.run_id,
        delivery.location
    );
    Ok(())
}
