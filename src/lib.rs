// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai_adapter;
pub mod config;
pub mod history;
pub mod ingest;
pub mod pipeline;
pub mod prompt;

// ---- Re-exports for stable public API ----
pub use crate::ai_adapter::{build_generator, ForecastOutcome, GenerationRequest, TextGenerator};
pub use crate::config::AppConfig;
pub use crate::history::{DedupeMode, ForecastEntry, HistoryLog, HistoryStore};
pub use crate::ingest::types::{FeedSource, Headline};
pub use crate::pipeline::{run_once, RunReport};
