use async_trait::async_trait;

/// A finished digest handed to a delivery sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestArtifact {
    /// Human-readable title, e.g. "AI Daily Digest | 2026-10-18".
    pub title: String,
    /// The full Markdown document.
    pub text: String,
}

impl DigestArtifact {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Where a sink put the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub location: String,
}

// Sinks sit outside the ranking pipeline. The pipeline only ever produces a
// `DigestArtifact`; document services, mail, or the local filesystem decide
// what to do with it.
#[async_trait]
pub trait DigestSink: Send + Sync {
    /// Short name used in log lines.
    fn sink_name(&self) -> String;

    /// Submit the finished text + title, receive a location or an error.
    async fn deliver(&self, artifact: &DigestArtifact) -> anyhow::Result<Delivery>;
}
