use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use interfaces::{Delivery, DigestArtifact, DigestSink};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn default_file_name(date: NaiveDate) -> String {
    format!("ai-daily-digest-{}.md", date.format("%Y-%m-%d"))
}

/// Writes the digest to a Markdown file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// `ai-daily-digest-YYYY-MM-DD.md` inside `dir`.
    pub fn in_dir(dir: &Path, date: NaiveDate) -> Self {
        Self {
            path: dir.join(default_file_name(date)),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DigestSink for FileSink {
    fn sink_name(&self) -> String {
        "file".to_string()
    }

    async fn deliver(&self, artifact: &DigestArtifact) -> anyhow::Result<Delivery> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        tokio::fs::write(&self.path, artifact.text.as_bytes())
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;

        info!("Wrote \"{}\" to {}", artifact.title, self.path.display());
        Ok(Delivery {
            location: self.path.display().to_string(),
        })
    }
}
