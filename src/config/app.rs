// src/config/app.rs
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::history::DedupeMode;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/forecast.toml";
pub const ENV_CONFIG_PATH: &str = "FORECAST_CONFIG_PATH";
pub const ENV_HISTORY_PATH: &str = "FORECAST_HISTORY_PATH";
pub const ENV_DEDUPE_MODE: &str = "FORECAST_DEDUPE_MODE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCfg {
    pub name: String,
    pub url: String,
}

fn feed(name: &str, url: &str) -> FeedCfg {
    FeedCfg {
        name: name.to_string(),
        url: url.to_string(),
    }
}

fn default_feeds() -> Vec<FeedCfg> {
    vec![
        feed("TechCrunch", "https://techcrunch.com/feed/"),
        feed("The Verge", "https://www.theverge.com/rss/index.xml"),
        feed("Wired", "https://www.wired.com/feed/rss"),
        feed("ProductHunt", "https://www.producthunt.com/feed"),
        feed("VentureBeat", "https://venturebeat.com/feed/"),
        feed(
            "РБК Технологии",
            "https://rssexport.rbc.ru/rbcnews/technology/20/full.rss",
        ),
        feed("Хабр", "https://habr.com/ru/rss/all/all/"),
    ]
}

fn default_keywords() -> Vec<String> {
    [
        "tech", "technology", "startup", "innovation", "ai", "machine learning", "ux", "ui",
        "product", "design", "digital", "robot", "future", "trend", "технолог", "инновац",
        "стартап", "дизайн", "цифров", "продукт", "робот", "интерфейс",
        "искусственный интеллект", "машинное обучение", "гаджет", "разработка",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// Also search the entry summary, not just the title.
    pub match_summary: bool,
    /// Headlines passed on to the prompt after filtering.
    pub max_headlines: usize,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            match_summary: false,
            max_headlines: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchCfg {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub per_feed_limit: usize,
    /// Total raw entries collected across all feeds before fetching stops.
    pub max_items: usize,
    pub user_agent: String,
}

impl Default for FetchCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 4,
            per_feed_limit: 10,
            max_items: 100,
            user_agent: concat!("news-forecast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptCfg {
    /// Character budget for the headline list inside the prompt.
    pub max_chars: usize,
    /// Language the forecast should be written in.
    pub language: String,
}

impl Default for PromptCfg {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            language: "Russian".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorCfg {
    pub enabled: bool,
    /// "openai" | "mock" (case-insensitive)
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub base_url: String,
}

impl Default for GeneratorCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 800,
            temperature: 0.7,
            timeout_secs: 60,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryCfg {
    pub path: PathBuf,
    pub dedupe_mode: DedupeMode,
    /// Defaults per mode when absent: 7 for `per_day`, 200 for `none`.
    pub cap: Option<usize>,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/forecasts_history.json"),
            dedupe_mode: DedupeMode::PerDay,
            cap: None,
        }
    }
}

impl HistoryCfg {
    pub fn effective_cap(&self) -> usize {
        self.cap
            .unwrap_or_else(|| self.dedupe_mode.default_cap())
            .max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feeds: Vec<FeedCfg>,
    pub keywords: Vec<String>,
    pub filter: FilterCfg,
    pub fetch: FetchCfg,
    pub prompt: PromptCfg,
    pub generator: GeneratorCfg,
    pub history: HistoryCfg,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            keywords: default_keywords(),
            filter: FilterCfg::default(),
            fetch: FetchCfg::default(),
            prompt: PromptCfg::default(),
            generator: GeneratorCfg::default(),
            history: HistoryCfg::default(),
        }
    }
}

impl AppConfig {
    /// Resolve path from FORECAST_CONFIG_PATH or fall back to `config/forecast.toml`.
    /// A missing default file yields built-in defaults; a missing explicit path is an error.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
                if pb.exists() {
                    Self::load_from_file(&pb)?
                } else {
                    tracing::info!("no {DEFAULT_CONFIG_PATH}; using built-in defaults");
                    Self::default().sanitized()
                }
            }
        };
        cfg.apply_env_overrides()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(p) = std::env::var(ENV_HISTORY_PATH) {
            if !p.trim().is_empty() {
                self.history.path = PathBuf::from(p.trim());
            }
        }
        if let Ok(m) = std::env::var(ENV_DEDUPE_MODE) {
            self.history.dedupe_mode = m
                .parse()
                .with_context(|| format!("invalid {ENV_DEDUPE_MODE}"))?;
        }
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        // Normalize provider
        self.generator.provider = self.generator.provider.trim().to_lowercase();

        if !self.generator.temperature.is_finite() {
            self.generator.temperature = GeneratorCfg::default().temperature;
        }
        self.generator.temperature = self.generator.temperature.clamp(0.0, 1.0);
        self.generator.max_tokens = self.generator.max_tokens.max(1);
        self.generator.timeout_secs = self.generator.timeout_secs.max(1);

        // Timeouts are at least 1s; there is no "unbounded" setting.
        self.fetch.timeout_secs = self.fetch.timeout_secs.max(1);
        self.fetch.connect_timeout_secs = self.fetch.connect_timeout_secs.max(1);
        self.fetch.per_feed_limit = self.fetch.per_feed_limit.max(1);

        self.keywords = self
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_scheduled_job() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.feeds.len(), 7);
        assert_eq!(cfg.history.dedupe_mode, DedupeMode::PerDay);
        assert_eq!(cfg.history.effective_cap(), 7);
        assert_eq!(cfg.filter.max_headlines, 20);
        assert_eq!(cfg.prompt.max_chars, 2000);
    }

    #[test]
    fn partial_toml_keeps_defaults_and_sanitizes() {
        let cfg = AppConfig::from_toml_str(
            r#"
keywords = [" AI ", "", "robot"]

[[feeds]]
name = "A"
url = "https://a.example/rss"

[generator]
provider = " OpenAI "
temperature = 3.5

[history]
dedupe_mode = "none"
"#,
        )
        .unwrap();
        assert_eq!(cfg.feeds, vec![feed("A", "https://a.example/rss")]);
        assert_eq!(cfg.keywords, vec!["AI".to_string(), "robot".to_string()]);
        assert_eq!(cfg.generator.provider, "openai");
        assert_eq!(cfg.generator.temperature, 1.0);
        assert_eq!(cfg.generator.max_tokens, 800);
        assert_eq!(cfg.history.effective_cap(), 200);
    }

    #[test]
    fn shipped_sample_matches_builtins() {
        let cfg = AppConfig::from_toml_str(include_str!("../../config/forecast.toml")).unwrap();
        let def = AppConfig::default();
        assert_eq!(cfg.feeds, def.feeds);
        assert_eq!(cfg.keywords, def.keywords);
        assert_eq!(cfg.history.path, def.history.path);
        assert_eq!(cfg.history.effective_cap(), 7);
    }

    #[test]
    fn explicit_cap_wins_and_zero_becomes_one() {
        let cfg = AppConfig::from_toml_str("[history]\ncap = 3\n").unwrap();
        assert_eq!(cfg.history.effective_cap(), 3);
        let cfg = AppConfig::from_toml_str("[history]\ncap = 0\n").unwrap();
        assert_eq!(cfg.history.effective_cap(), 1);
    }
}
