// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedSource, Headline};

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(normalize_text).filter(|t| !t.is_empty())
}

// RSS `<link>` has no rel; Atom alternates may omit it too. `self`/`replies` etc. are skipped.
fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
        .filter(|h| !h.is_empty())
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// One named feed: RSS 0.9x/1.0/2.0 or Atom, parsed with feed-rs.
pub struct RssFeed {
    name: String,
    per_feed_limit: usize,
    mode: Mode,
}

impl RssFeed {
    pub fn from_fixture(name: impl Into<String>, xml: &str) -> Self {
        Self {
            name: name.into(),
            per_feed_limit: usize::MAX,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// `client` carries the timeouts; share one across feeds.
    pub fn from_url(name: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: name.into(),
            per_feed_limit: usize::MAX,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn with_per_feed_limit(mut self, n: usize) -> Self {
        self.per_feed_limit = n;
        self
    }

    fn to_headline(&self, e: Entry) -> Option<Headline> {
        let title = non_empty(e.title.as_ref().map(|t| t.content.as_str()))?;
        let summary = non_empty(e.summary.as_ref().map(|t| t.content.as_str())).or_else(|| {
            non_empty(e.content.as_ref().and_then(|c| c.body.as_deref()))
        });
        let published_at = e
            .published
            .or(e.updated)
            .and_then(|dt| u64::try_from(dt.timestamp()).ok());
        Some(Headline {
            source: self.name.clone(),
            title,
            summary,
            link: primary_link(&e.links),
            published_at,
        })
    }

    /// Parse feed content into headlines tagged with this feed's name.
    pub fn parse_str(&self, s: &str) -> Result<Vec<Headline>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);

        let feed = parser::parse(xml_clean.as_bytes())
            .with_context(|| format!("parsing feed xml for {}", self.name))?;
        let out: Vec<Headline> = feed
            .entries
            .into_iter()
            .filter_map(|e| self.to_headline(e))
            .take(self.per_feed_limit)
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for RssFeed {
    async fn fetch_latest(&self) -> Result<Vec<Headline>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?
                    .error_for_status()
                    .with_context(|| format!("{} non-2xx", self.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                self.parse_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Rewrite HTML named entities (`&nbsp;`, `&copy;`, `&eacute;`, ...) as numeric
/// character references, which every XML parser accepts. The five XML entities
/// and unknown names are left alone.
fn scrub_html_entities_for_xml(s: &str) -> String {
    static RE_ENTITY: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_ENTITY.get_or_init(|| regex::Regex::new(r"&([A-Za-z][A-Za-z0-9]{1,31});").unwrap());

    re.replace_all(s, |caps: &regex::Captures| {
        let whole = &caps[0];
        if matches!(&caps[1], "amp" | "lt" | "gt" | "quot" | "apos") {
            return whole.to_string();
        }
        let decoded = html_escape::decode_html_entities(whole);
        if decoded == whole {
            return whole.to_string();
        }
        decoded
            .chars()
            .map(|c| format!("&#x{:X};", c as u32))
            .collect()
    })
    .into_owned()
}
