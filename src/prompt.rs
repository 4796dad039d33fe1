// src/prompt.rs
//! Prompt assembly: bulleted headline list, bounded in characters, stamped with the build time.

use chrono::{DateTime, Utc};

use crate::config::PromptCfg;
use crate::ingest::types::Headline;

pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// `- Title (Source)` per line.
pub fn bullet_list(headlines: &[Headline]) -> String {
    headlines
        .iter()
        .map(|h| format!("- {}", h.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `s` to at most `max_chars` characters and append the marker when anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], TRUNCATION_MARKER),
        None => s.to_string(),
    }
}

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Deterministic for the same headlines, time and config.
pub fn build_prompt(headlines: &[Headline], now: DateTime<Utc>, cfg: &PromptCfg) -> String {
    let joined = truncate_chars(&bullet_list(headlines), cfg.max_chars);
    format!(
        "You are an expert in technology and product design.
Use the fresh news below (global and Russian sources) to produce forecasts in a technology and design context.

Answer format:
1. Forecast for the week: short-term technology and design trends, new ideas and tendencies.
2. Forecast for the month: where technology, products and the design industry are heading.
3. Forecast for the year: major shifts, trends and innovations that may affect product designers and technology companies.

Also give short recommendations for designers and product specialists so they can adapt to these changes.
Focus on technology and product trends, the impact of AI, UX/UI design and digital change. Leave out politics and military topics.

News (as of {ts}):
{joined}

Answer in {lang}.
",
        ts = timestamp(now),
        lang = cfg.language,
    )
}
