//! news-forecast binary entrypoint.
//! Loads config, fetches feeds, asks the model for a forecast and records it.
//!
//! Exit code is 0 whenever the run completes, including "nothing to do".

use chrono::Utc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_forecast::ingest::providers::build_sources;
use news_forecast::{build_generator, run_once, AppConfig, HistoryStore, RunReport};

/// RUST_LOG controls the filter (default `info`); LOG_FORMAT=json switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer().compact()))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load()?;
    let store = HistoryStore::from_config(&cfg.history);
    info!(
        feeds = cfg.feeds.len(),
        keywords = cfg.keywords.len(),
        provider = %cfg.generator.provider,
        model = %cfg.generator.model,
        history = %store.path().display(),
        cap = store.cap(),
        mode = ?store.mode(),
        "config loaded"
    );

    let sources = build_sources(&cfg.feeds, &cfg.fetch)?;
    let generator = build_generator(&cfg.generator)?;

    let report = run_once(&cfg, &sources, generator.as_ref(), &store, Utc::now()).await?;

    if let RunReport::Persisted { headlines, .. } = &report {
        println!("Headlines used ({}):", headlines.len());
        for h in headlines {
            println!("  • {h}");
        }
    }
    println!("{}", report.message());
    Ok(())
}
