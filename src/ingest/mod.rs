// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{FeedSource, Headline};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Total entries parsed from feeds.");
        describe_counter!(
            "ingest_kept_total",
            "Headlines kept after keyword filtering."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Headlines dropped by the keyword filter."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Normalize feed text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. NBSP left over from &nbsp;)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// True when any non-blank keyword is a case-insensitive substring of `text`.
/// An empty keyword list never matches.
pub fn matches_keywords<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let haystack = text.to_lowercase();
    keywords.iter().any(|k| {
        let k = k.as_ref().trim();
        !k.is_empty() && haystack.contains(&k.to_lowercase())
    })
}

/// Keep headlines whose title (and, with `match_summary`, summary) hits a keyword.
/// Input order is preserved.
pub fn filter_headlines<S: AsRef<str>>(
    headlines: Vec<Headline>,
    keywords: &[S],
    match_summary: bool,
) -> Vec<Headline> {
    ensure_metrics_described();

    let total = headlines.len();
    let kept: Vec<Headline> = headlines
        .into_iter()
        .filter(|h| {
            matches_keywords(&h.title, keywords)
                || (match_summary
                    && h
                        .summary
                        .as_deref()
                        .is_some_and(|s| matches_keywords(s, keywords)))
        })
        .collect();

    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_filtered_total").increment((total - kept.len()) as u64);
    kept
}

/// Fetch feeds one after another, skipping any feed that fails.
/// Stops as soon as `limit` headlines have been collected.
pub async fn fetch_all(sources: &[Box<dyn FeedSource>], limit: usize) -> Vec<Headline> {
    ensure_metrics_described();

    let mut out = Vec::new();
    for src in sources {
        if out.len() >= limit {
            break;
        }
        match src.fetch_latest().await {
            Ok(items) => {
                tracing::debug!(target: "ingest", feed = src.name(), items = items.len(), "feed ok");
                let room = limit - out.len();
                out.extend(items.into_iter().take(room));
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, feed = src.name(), "feed skipped");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    tracing::info!(target: "ingest", feeds = sources.len(), collected = out.len(), "fetch done");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Hello,&nbsp;&nbsp; world?</b>  ";
        assert_eq!(normalize_text(s), "Hello, world?");
    }

    #[test]
    fn normalize_text_folds_quotes() {
        assert_eq!(normalize_text("«Яндекс» “ships”"), r#""Яндекс" "ships""#);
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let kw = vec!["AI".to_string(), "стартап".to_string()];
        assert!(matches_keywords("OpenAI ships a model", &kw));
        assert!(matches_keywords("Новый СТАРТАП из Казани", &kw));
        assert!(!matches_keywords("Sports result", &kw));
    }

    #[test]
    fn empty_or_blank_keywords_match_nothing() {
        let none: Vec<String> = vec![];
        assert!(!matches_keywords("anything at all", &none));
        assert!(!matches_keywords("anything at all", &["  ".to_string()]));
    }

    #[test]
    fn summary_only_counts_when_enabled() {
        let h = Headline::new("A", "Quarterly numbers").with_summary("a robot did it");
        let kw = ["robot"];
        assert!(filter_headlines(vec![h.clone()], &kw, false).is_empty());
        assert_eq!(filter_headlines(vec![h], &kw, true).len(), 1);
    }
}
