// tests/providers_rss.rs
use news_forecast::ingest::providers::rss::RssFeed;
use news_forecast::ingest::types::FeedSource;

const RSS_XML: &str = include_str!("fixtures/tech_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/tech_atom.xml");

#[tokio::test]
async fn rss_fixture_parses_and_normalizes() {
    let feed = RssFeed::from_fixture("Tech Daily", RSS_XML);

    let items = feed.fetch_latest().await.expect("rss parse ok");
    assert_eq!(items.len(), 4);
    assert!(items.iter().all(|h| h.source == "Tech Daily"));

    assert_eq!(items[0].title, "AI startup launches design copilot");
    assert_eq!(
        items[0].summary.as_deref(),
        Some("The company raised a seed round.")
    );
    assert_eq!(items[0].link.as_deref(), Some("https://tech.example/ai-startup"));
    assert_eq!(items[0].published_at, Some(1_760_515_200));

    // &nbsp; is scrubbed before XML parsing
    assert_eq!(
        items[1].summary.as_deref(),
        Some("Not about technology at all.")
    );
    assert_eq!(items[2].title, "Российский стартап показал робота-курьера");
    assert_eq!(items[3].title, "Weekly market wrap");
}

#[tokio::test]
async fn atom_fixture_parses() {
    let feed = RssFeed::from_fixture("Design Notes", ATOM_XML);

    let items = feed.fetch_latest().await.expect("atom parse ok");
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title, "Digital product & UX trends");
    assert_eq!(items[0].summary.as_deref(), Some("Interfaces are getting quieter."));
    assert_eq!(items[0].link.as_deref(), Some("https://design.example/ux-trends"));
    assert_eq!(items[0].published_at, Some(1_760_518_800));

    // content is the fallback when there is no summary
    assert_eq!(items[1].summary.as_deref(), Some("Plant bulbs now."));
    assert_eq!(items[1].link.as_deref(), Some("https://design.example/garden"));
    assert_eq!(items[1].published_at, Some(1_760_436_000));
}

#[tokio::test]
async fn publisher_extensions_do_not_break_items() {
    let feed = RssFeed::from_fixture("Publisher", include_str!("fixtures/publisher_rss.xml"));

    let items = feed.fetch_latest().await.expect("namespaced siblings parse");
    assert_eq!(items.len(), 2);

    // <media:title> and <atom:link> sit next to <title>/<link>
    assert_eq!(items[0].title, "Robot couriers reach Helsinki");
    assert_eq!(items[0].link.as_deref(), Some("https://pub.example/robots"));
    assert_eq!(items[0].published_at, Some(1_760_590_800));
    assert!(items[0]
        .summary
        .as_deref()
        .is_some_and(|s| s.contains("cafés first")));

    assert_eq!(items[1].title, "Design systems © the hard way");
    assert_eq!(items[1].summary.as_deref(), Some("Tokens, themes & tooling."));
}

#[tokio::test]
async fn rdf_feed_yields_items() {
    let feed = RssFeed::from_fixture("RDF Tech", include_str!("fixtures/tech_rdf.xml"));

    let items = feed.fetch_latest().await.expect("rss 1.0 parse ok");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Startup ships open UX toolkit");
    assert_eq!(items[0].link.as_deref(), Some("https://rdf.example/startup"));
}

#[tokio::test]
async fn xhtml_atom_title_is_kept() {
    let feed = RssFeed::from_fixture("Mixed", include_str!("fixtures/xhtml_atom.xml"));

    let items = feed.fetch_latest().await.expect("atom parse ok");
    assert_eq!(items.len(), 2);
    assert!(items[0].title.starts_with("AI"), "got {:?}", items[0].title);
    assert!(!items[0].title.contains('<'));
    assert_eq!(items[1].title, "Robot news");
}

#[tokio::test]
async fn per_feed_limit_keeps_first_entries() {
    let feed = RssFeed::from_fixture("Tech Daily", RSS_XML).with_per_feed_limit(2);
    let items = feed.fetch_latest().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].title, "Sports result: home team wins");
}

#[tokio::test]
async fn http_feed_is_fetched_and_parsed() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/feed")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(RSS_XML)
        .create_async()
        .await;

    let feed = RssFeed::from_url(
        "Tech Daily",
        format!("{}/feed", server.url()),
        reqwest::Client::new(),
    );
    let items = feed.fetch_latest().await.expect("http fetch ok");
    assert_eq!(items.len(), 4);

    mock.assert_async().await;
}

#[tokio::test]
async fn http_error_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/feed")
        .with_status(503)
        .with_body("try later")
        .create_async()
        .await;

    let feed = RssFeed::from_url(
        "Down",
        format!("{}/feed", server.url()),
        reqwest::Client::new(),
    );
    assert!(feed.fetch_latest().await.is_err());
}
