use crate::types::{DigestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.moonshot.cn/v1";
pub const DEFAULT_MODEL: &str = "kimi-k2-5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
}

impl Language {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "cn" | "chinese" => Some(Language::Zh),
            "en" | "en-us" | "english" => Some(Language::En),
            _ => None,
        }
    }

    /// Name used when asking the model for localized text.
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::Zh => "Simplified Chinese",
            Language::En => "English",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Zh
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_ms: u64,
    pub concurrency: usize,
    /// Upper bound on URLs tried per source (primary + fallbacks + redirects).
    pub max_candidates: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "AI-Daily-Digest/1.0 (RSS Reader)".to_string(),
            timeout_ms: 15_000,
            concurrency: 10,
            max_candidates: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub batch_size: usize,
    pub max_concurrent: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 4000,
            timeout_secs: 120,
            batch_size: 10,
            max_concurrent: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub database_path: PathBuf,
    pub retention_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: config_dir().join("cache.db"),
            retention_days: 30,
        }
    }
}

/// Everything a run needs, built once and passed into every stage.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub window_hours: i64,
    pub top_n: usize,
    pub language: Language,
    pub incremental: bool,
    pub output_dir: PathBuf,
    pub output_path: Option<PathBuf>,
    pub fetch: FetchConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            window_hours: 48,
            top_n: 15,
            language: Language::default(),
            incremental: false,
            output_dir: home_dir().join("Desktop"),
            output_path: None,
            fetch: FetchConfig::default(),
            llm: LlmConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// On-disk shape of `~/.ai-daily-digest/config.json`. Every key is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub gateway_url: Option<String>,
    pub model: Option<String>,
    pub default_hours: Option<i64>,
    pub default_top_n: Option<usize>,
    pub language: Option<String>,
    pub output_dir: Option<String>,
    pub cache_retention_days: Option<i64>,
}

impl ConfigFile {
    /// A missing file is an empty config; an unreadable one is logged and ignored.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .map_err(DigestError::from)
            .and_then(|raw| serde_json::from_str::<ConfigFile>(&raw).map_err(DigestError::from))
        {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to load config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

impl DigestConfig {
    /// Defaults, then the config file, then environment variables.
    pub fn load() -> Self {
        let file = ConfigFile::load(&config_file_path());
        let mut config = Self::default();
        config.apply_file(&file);
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn apply_file(&mut self, file: &ConfigFile) {
        if let Some(key) = non_empty(file.api_key.as_deref()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty(file.gateway_url.as_deref()) {
            self.llm.endpoint = url;
        }
        if let Some(model) = non_empty(file.model.as_deref()) {
            self.llm.model = model;
        }
        if let Some(hours) = file.default_hours.filter(|h| *h > 0) {
            self.window_hours = hours;
        }
        if let Some(top_n) = file.default_top_n.filter(|n| *n > 0) {
            self.top_n = top_n;
        }
        if let Some(language) = file.language.as_deref().and_then(Language::parse) {
            self.language = language;
        }
        if let Some(dir) = non_empty(file.output_dir.as_deref()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(days) = file.cache_retention_days.filter(|d| *d > 0) {
            self.cache.retention_days = days;
        }
    }

    /// `lookup` is `std::env::var` in production; tests pass a closure over a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = non_empty(lookup("MOONSHOT_API_KEY").as_deref()) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty(lookup("AI_DIGEST_GATEWAY").as_deref()) {
            self.llm.endpoint = url;
        }
        if let Some(hours) = lookup("AI_DIGEST_HOURS").and_then(|v| v.trim().parse::<i64>().ok()) {
            if hours > 0 {
                self.window_hours = hours;
            } else {
                warn!("Ignoring non-positive AI_DIGEST_HOURS={}", hours);
            }
        }
        if let Some(top_n) = lookup("AI_DIGEST_TOP_N").and_then(|v| v.trim().parse::<usize>().ok()) {
            if top_n > 0 {
                self.top_n = top_n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(DigestError::Config(
                "API key required: set MOONSHOT_API_KEY, pass --api-key, or add api_key to the config file".to_string(),
            ));
        }
        if self.window_hours <= 0 {
            return Err(DigestError::Config(format!("window must be positive, got {}h", self.window_hours)));
        }
        if self.top_n == 0 {
            return Err(DigestError::Config("top-n must be at least 1".to_string()));
        }
        if self.fetch.concurrency == 0 || self.llm.max_concurrent == 0 || self.llm.batch_size == 0 {
            return Err(DigestError::Config("concurrency and batch sizes must be at least 1".to_string()));
        }
        Ok(())
    }
}

pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_dir() -> PathBuf {
    home_dir().join(".ai-daily-digest")
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
