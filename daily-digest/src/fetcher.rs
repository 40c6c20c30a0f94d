use crate::config::FetchConfig;
use crate::parser::FeedParser;
use crate::registry::FeedRegistry;
use crate::types::{FeedSource, FetchFailure, FetchOutcome, Result, SourceFetch, TlsProfile};
use futures::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, StatusCode};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml, */*";

/// How often a progress line is logged while sources resolve.
const PROGRESS_EVERY: usize = 10;

pub struct Fetcher {
    standard: Client,
    legacy: Client,
    parser: FeedParser,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            standard: build_client(config, TlsProfile::Standard)?,
            legacy: build_client(config, TlsProfile::Legacy)?,
            parser: FeedParser::new(),
            config: config.clone(),
        })
    }

    fn client_for(&self, profile: TlsProfile) -> &Client {
        match profile {
            TlsProfile::Standard => &self.standard,
            TlsProfile::Legacy => &self.legacy,
        }
    }

    /// Fetch every registered source with at most `concurrency` in flight.
    ///
    /// Results come back in registry order regardless of completion order.
    pub async fn fetch_all(&self, registry: &FeedRegistry) -> Vec<SourceFetch> {
        let total = registry.len();
        let started = Instant::now();
        info!("Fetching {} feeds (concurrency {})", total, self.config.concurrency);

        // Unordered so a slow source only holds its own slot.
        let mut pending = stream::iter(registry.sources().iter().enumerate())
            .map(|(index, source)| async move { (index, self.fetch_source(source).await) })
            .buffer_unordered(self.config.concurrency.max(1));

        let mut indexed = Vec::with_capacity(total);
        let mut succeeded = 0usize;
        let mut article_total = 0usize;
        while let Some((index, result)) = pending.next().await {
            if matches!(result.outcome, FetchOutcome::Fetched { .. }) {
                succeeded += 1;
            }
            article_total += result.articles().len();
            indexed.push((index, result));

            if indexed.len() % PROGRESS_EVERY == 0 || indexed.len() == total {
                info!("Progress: {}/{} feeds processed ({} ok)", indexed.len(), total, succeeded);
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<SourceFetch> = indexed.into_iter().map(|(_, result)| result).collect();

        info!(
            "Fetched {} articles from {}/{} feeds in {:.1}s",
            article_total,
            succeeded,
            total,
            started.elapsed().as_secs_f64()
        );
        results
    }

    /// Walk one source's candidate URLs until one yields a document.
    ///
    /// Never returns an error: every failure is folded into the outcome.
    pub async fn fetch_source(&self, source: &FeedSource) -> SourceFetch {
        let client = self.client_for(source.effective_tls_profile());
        let mut candidates = vec![source.xml_url.clone()];
        for fallback in &source.fallback_urls {
            if !candidates.contains(fallback) {
                candidates.push(fallback.clone());
            }
        }

        let mut last_failure = FetchFailure::Other("no candidate URLs".to_string());
        let mut index = 0;
        while index < candidates.len() {
            let url = candidates[index].clone();
            index += 1;
            debug!("Fetching {} from {}", source.name, url);

            let response = match client.get(&url).header(ACCEPT, FEED_ACCEPT).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_failure = classify_error(&e);
                    debug!("{}: {} failed: {}", source.name, url, last_failure);
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                match response.bytes().await {
                    Ok(body) => {
                        let xml = String::from_utf8_lossy(&body);
                        let articles = self.parser.parse_articles(&xml, source);
                        info!("✓ {}: {} articles", source.name, articles.len());
                        return SourceFetch {
                            source_name: source.name.clone(),
                            outcome: FetchOutcome::Fetched { url, articles },
                        };
                    }
                    Err(e) => {
                        last_failure = classify_error(&e);
                        continue;
                    }
                }
            }

            if is_followable_redirect(status) {
                if let Some(target) = redirect_target(&url, response.headers().get(LOCATION)) {
                    if candidates.contains(&target) {
                        last_failure = FetchFailure::RedirectExhausted { status: status.as_u16() };
                        continue;
                    }
                    if candidates.len() >= self.config.max_candidates {
                        last_failure = FetchFailure::RedirectExhausted { status: status.as_u16() };
                        break;
                    }
                    info!("→ {}: following redirect to {}", source.name, target);
                    candidates.push(target);
                    last_failure = FetchFailure::RedirectExhausted { status: status.as_u16() };
                    continue;
                }
            }

            last_failure = FetchFailure::HttpStatus(status.as_u16());
            break;
        }

        warn!(
            kind = last_failure.tag(),
            "✗ {}: {}",
            source.name,
            last_failure
        );
        SourceFetch {
            source_name: source.name.clone(),
            outcome: FetchOutcome::Failed(last_failure),
        }
    }
}

fn build_client(config: &FetchConfig, profile: TlsProfile) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_millis(config.timeout_ms))
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .redirect(reqwest::redirect::Policy::none())
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true);

    if profile == TlsProfile::Legacy {
        builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_0);
    }

    Ok(builder.build()?)
}

fn is_followable_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Absolute redirect target; relative locations resolve against `current`.
fn redirect_target(current: &str, location: Option<&reqwest::header::HeaderValue>) -> Option<String> {
    let location = location?.to_str().ok()?.trim();
    if location.is_empty() {
        return None;
    }
    let base = Url::parse(current).ok()?;
    base.join(location).ok().map(|u| u.to_string())
}

fn classify_error(error: &reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        return FetchFailure::Timeout;
    }

    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        chain.push_str(": ");
        chain.push_str(&inner.to_string());
        source = inner.source();
    }

    let lowered = chain.to_lowercase();
    if lowered.contains("timed out") {
        FetchFailure::Timeout
    } else if ["certificate", "ssl", "tls", "handshake"].iter().any(|k| lowered.contains(k)) {
        FetchFailure::Tls(chain)
    } else {
        FetchFailure::Other(chain)
    }
}

