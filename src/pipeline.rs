// src/pipeline.rs
//! One forecast run: fetch → filter → prompt → generate → record.

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::info;

use crate::ai_adapter::{generate, ForecastOutcome, GenerationRequest, TextGenerator};
use crate::config::AppConfig;
use crate::history::{ForecastEntry, HistoryStore, RecordOutcome};
use crate::ingest::types::{FeedSource, Headline};
use crate::ingest::{fetch_all, filter_headlines};
use crate::prompt::build_prompt;

pub const NO_FORECAST_MESSAGE: &str = "no forecast produced";

/// How a run ended. Only `Persisted` wrote to the history file.
#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    /// Nothing matched the keywords (or every feed failed).
    NoHeadlines,
    /// Per-day mode and today's entry already exists.
    AlreadyRecorded { key: String },
    NoForecast { reason: String, headlines: usize },
    Persisted {
        key: String,
        history_len: usize,
        headlines: Vec<String>,
        forecast: String,
    },
}

impl RunReport {
    /// Operator-facing one-liner.
    pub fn message(&self) -> String {
        match self {
            RunReport::NoHeadlines => {
                "No relevant headlines found; forecast not created.".to_string()
            }
            RunReport::AlreadyRecorded { key } => {
                format!("Forecast for {key} already recorded; nothing to do.")
            }
            RunReport::NoForecast { reason, headlines } => {
                format!("{NO_FORECAST_MESSAGE} from {headlines} headlines ({reason}); history unchanged.")
            }
            RunReport::Persisted {
                key, history_len, ..
            } => format!("Forecast updated ({key}); history holds {history_len} entries."),
        }
    }

    pub fn persisted(&self) -> bool {
        matches!(self, RunReport::Persisted { .. })
    }
}

/// Fetch and keyword-filter headlines, capped at `filter.max_headlines`.
pub async fn collect_headlines(cfg: &AppConfig, sources: &[Box<dyn FeedSource>]) -> Vec<Headline> {
    let raw = fetch_all(sources, cfg.fetch.max_items).await;
    let mut kept = filter_headlines(raw, &cfg.keywords, cfg.filter.match_summary);
    kept.truncate(cfg.filter.max_headlines);
    info!(target: "pipeline", headlines = kept.len(), "headlines selected");
    kept
}

/// Run the full cycle once. `Err` only for history write failures.
pub async fn run_once(
    cfg: &AppConfig,
    sources: &[Box<dyn FeedSource>],
    generator: &dyn TextGenerator,
    store: &HistoryStore,
    now: DateTime<Utc>,
) -> Result<RunReport> {
    let key = store.mode().key_for(now);
    if store.is_recorded(&key) {
        info!(target: "pipeline", %key, "already recorded; skipping fetch and generation");
        return Ok(RunReport::AlreadyRecorded { key });
    }

    let headlines = collect_headlines(cfg, sources).await;
    if headlines.is_empty() {
        return Ok(RunReport::NoHeadlines);
    }

    let prompt = build_prompt(&headlines, now, &cfg.prompt);
    let req = GenerationRequest::from_config(prompt, &cfg.generator);
    let forecast = match generate(generator, &req).await {
        ForecastOutcome::Produced(text) => text,
        ForecastOutcome::Empty => {
            return Ok(RunReport::NoForecast {
                reason: "empty response".to_string(),
                headlines: headlines.len(),
            })
        }
        ForecastOutcome::Failed { message } => {
            return Ok(RunReport::NoForecast {
                reason: message,
                headlines: headlines.len(),
            })
        }
    };

    let shown: Vec<String> = headlines.iter().map(Headline::display).collect();
    let entry = ForecastEntry::new(key.clone(), forecast.clone()).with_metadata(
        &req.model,
        req.temperature,
        shown.clone(),
    );

    match store.record(entry)? {
        RecordOutcome::Persisted { len } => {
            counter!("forecast_persisted_total").increment(1);
            Ok(RunReport::Persisted {
                key,
                history_len: len,
                headlines: shown,
                forecast,
            })
        }
        // another run stored today's entry while we were generating
        RecordOutcome::AlreadyRecorded => Ok(RunReport::AlreadyRecorded { key }),
    }
}
