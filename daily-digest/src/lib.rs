pub mod types;
pub mod config;
pub mod registry;
pub mod fetcher;
pub mod parser;
pub mod dates;
pub mod cache;
pub mod filter;
pub mod llm_adapter;
pub mod scoring;
pub mod summarizer;
pub mod trends;
pub mod ranker;
pub mod digest;
pub mod output;
pub mod pipeline;

pub use types::*;
pub use config::{DigestConfig, Language};
pub use registry::FeedRegistry;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use cache::{ArticleCache, NoopCache, SqliteCache};
pub use llm_adapter::{ChatCompletionClient, CompletionClient, MockCompletionClient};
pub use output::FileSink;
pub use pipeline::{DigestPipeline, DigestRun};
