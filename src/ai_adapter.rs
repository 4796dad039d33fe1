//! AI adapter: text-generation provider abstraction + fail-closed forecast outcome.
//!
//! Providers return `anyhow::Result<String>`; `generate` folds every failure into a
//! `ForecastOutcome` so callers branch on the outcome instead of handling errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::GeneratorCfg;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    /// 0.0 ..= 1.0
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn from_config(prompt: String, cfg: &GeneratorCfg) -> Self {
        Self {
            prompt,
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens.max(1),
            temperature: cfg.temperature.clamp(0.0, 1.0),
        }
    }
}

/// Result of one generation attempt. Only `Produced` may be persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Produced(String),
    /// The service answered with nothing but whitespace.
    Empty,
    /// Transport/API failure, already rendered for the operator.
    Failed { message: String },
}

impl ForecastOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            ForecastOutcome::Produced(t) => Some(t),
            _ => None,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, req: &GenerationRequest) -> Result<String>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn TextGenerator>;

/// Call the provider once; errors and blank output never escape as `Err`.
pub async fn generate(generator: &dyn TextGenerator, req: &GenerationRequest) -> ForecastOutcome {
    match generator.complete(req).await {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                tracing::warn!(provider = generator.provider_name(), "generation returned empty text");
                ForecastOutcome::Empty
            } else {
                ForecastOutcome::Produced(text.to_string())
            }
        }
        Err(e) => {
            tracing::error!(provider = generator.provider_name(), error = ?e, "generation failed");
            counter!("forecast_generation_failures_total").increment(1);
            ForecastOutcome::Failed {
                message: format!("Generation service error: {e:#}"),
            }
        }
    }
}

/// Factory: build a generator according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock.
/// * Else if `enabled == false`, returns a generator that always fails.
/// * Else builds the configured provider (`openai` or `mock`).
pub fn build_generator(cfg: &GeneratorCfg) -> Result<DynGenerator> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockGenerator::new(MOCK_FORECAST)));
    }

    if !cfg.enabled {
        return Ok(Arc::new(DisabledGenerator));
    }

    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::from_env(cfg)?)),
        "mock" => Ok(Arc::new(MockGenerator::new(MOCK_FORECAST))),
        other => Err(anyhow!("Unsupported generator provider in config: {other}")),
    }
}

const MOCK_FORECAST: &str = "Week: more AI assistants ship inside design tools.\n\
Month: product teams consolidate around a few model vendors.\n\
Year: interfaces shift from screens to agents.";

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// OpenAI Chat Completions. Requires `OPENAI_API_KEY`.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("news-forecast/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building openai http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// A missing key is not an error here; each call then fails closed.
    pub fn from_env(cfg: &GeneratorCfg) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; generation will fail");
        }
        Self::new(api_key, cfg.base_url.clone(), Duration::from_secs(cfg.timeout_secs))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, req: &GenerationRequest) -> Result<String> {
        if self.api_key.is_empty() {
            bail!("missing OPENAI_API_KEY");
        }

        let body = Req {
            model: &req.model,
            messages: vec![Msg {
                role: "user",
                content: &req.prompt,
            }],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(300).collect();
            bail!("openai HTTP {status}: {snippet}");
        }

        let parsed: Resp = resp.json().await.context("openai response json")?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("openai response had no choices"))?;
        Ok(choice.message.content.unwrap_or_default())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Always fails; used when generation is disabled in config.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn complete(&self, _req: &GenerationRequest) -> Result<String> {
        bail!("text generation is disabled in config")
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed reply for tests/local runs.
#[derive(Clone)]
pub struct MockGenerator {
    pub fixed: String,
}

impl MockGenerator {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, _req: &GenerationRequest) -> Result<String> {
        Ok(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> GenerationRequest {
        GenerationRequest::from_config("p".into(), &GeneratorCfg::default())
    }

    #[tokio::test]
    async fn produced_text_is_trimmed() {
        let out = generate(&MockGenerator::new("  forecast \n"), &req()).await;
        assert_eq!(out, ForecastOutcome::Produced("forecast".into()));
        assert_eq!(out.text(), Some("forecast"));
    }

    #[tokio::test]
    async fn whitespace_is_empty() {
        let out = generate(&MockGenerator::new(" \n\t "), &req()).await;
        assert_eq!(out, ForecastOutcome::Empty);
        assert_eq!(out.text(), None);
    }

    #[tokio::test]
    async fn errors_become_messages() {
        match generate(&DisabledGenerator, &req()).await {
            ForecastOutcome::Failed { message } => {
                assert!(message.starts_with("Generation service error:"));
                assert!(message.contains("disabled"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn request_clamps_temperature() {
        let cfg = GeneratorCfg {
            temperature: 1.7,
            max_tokens: 0,
            ..GeneratorCfg::default()
        };
        let r = GenerationRequest::from_config("x".into(), &cfg);
        assert_eq!(r.temperature, 1.0);
        assert_eq!(r.max_tokens, 1);
    }
}
