use crate::config::LlmConfig;
use crate::types::{DigestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// A one-shot text completion service.
///
/// Calls are never retried here; a failed call is reported to the caller,
/// which decides whether that unit of work is dropped.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn adapter_name(&self) -> String;

    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible `POST {endpoint}/chat/completions`.
pub struct ChatCompletionClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DigestError::Config("API key required for the completion endpoint".to_string()))?;

        let http = Client::builder()
            .user_agent("AI-Daily-Digest/1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    fn adapter_name(&self) -> String {
        format!("chat-completions:{}", self.model)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("POST {} ({} prompt chars)", url, prompt.chars().count());

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(DigestError::Llm(format!("HTTP {}: {}", status.as_u16(), snippet)));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DigestError::Llm("response carried no completion text".to_string()))
    }
}

/// Canned responses for development and tests.
///
/// The handler sees each prompt and decides the reply, so one mock can serve
/// scoring, summary and trend requests alike.
pub struct MockCompletionClient {
    name: String,
    handler: Box<dyn Fn(&str) -> Result<String> + Send + Sync>,
    calls: AtomicUsize,
}

impl MockCompletionClient {
    pub fn new<F>(name: &str, handler: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    fn adapter_name(&self) -> String {
        self.name.clone()
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(prompt)
    }
}

/// Drop an enclosing ``` / ```json fence if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json", "JSON", ...) on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a JSON completion, tolerating a code fence and stray prose around
/// the outermost object.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fence(text);
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            let object = match (body.find('{'), body.rfind('}')) {
                (Some(start), Some(end)) if start < end => &body[start..=end],
                _ => return Err(first_error.into()),
            };
            serde_json::from_str(object).map_err(DigestError::from)
        }
    }
}
