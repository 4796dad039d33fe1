// src/ingest/types.rs
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub source: String, // feed name from config, e.g. "TechCrunch"
    pub title: String,  // normalized title
    pub summary: Option<String>,
    pub link: Option<String>,
    pub published_at: Option<u64>, // unix seconds
}

impl Headline {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            summary: None,
            link: None,
            published_at: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Display form used in prompts and run reports: `Title (Source)`.
    pub fn display(&self) -> String {
        format!("{} ({})", self.title, self.source)
    }
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Headline>>;
    fn name(&self) -> &str;
}
