// src/ingest/providers/mod.rs
pub mod rss;

use anyhow::{Context, Result};
use std::time::Duration;

use crate::config::{FeedCfg, FetchCfg};
use crate::ingest::types::FeedSource;
use rss::RssFeed;

/// HTTP client for feed retrieval; the timeouts bound per-feed latency.
pub fn build_http_client(cfg: &FetchCfg) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()
        .context("building feed http client")
}

/// One HTTP-backed source per configured feed, in config order.
pub fn build_sources(feeds: &[FeedCfg], fetch: &FetchCfg) -> Result<Vec<Box<dyn FeedSource>>> {
    let client = build_http_client(fetch)?;
    Ok(feeds
        .iter()
        .map(|f| {
            Box::new(
                RssFeed::from_url(f.name.clone(), f.url.clone(), client.clone())
                    .with_per_feed_limit(fetch.per_feed_limit),
            ) as Box<dyn FeedSource>
        })
        .collect())
}
