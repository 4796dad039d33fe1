// src/config/mod.rs
pub mod app;

pub use app::{AppConfig, FeedCfg, FetchCfg, FilterCfg, GeneratorCfg, HistoryCfg, PromptCfg};
