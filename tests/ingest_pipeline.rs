// tests/ingest_pipeline.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use narrative_engine::ingest::providers::{FarcasterProvider, GithubProvider, RssProvider};
use narrative_engine::ingest::types::SourceProvider;
use narrative_engine::signal::{Signal, Source};
use narrative_engine::store::{MemoryStore, SignalStore};

const FEED_XML: &str = include_str!("fixtures/substack_feed.xml");
const GITHUB_JSON: &str = include_str!("fixtures/github_search.json");
const CASTS_JSON: &str = include_str!("fixtures/farcaster_casts.json");

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-06-10T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

struct BrokenProvider;

#[async_trait]
impl SourceProvider for BrokenProvider {
    async fn fetch_latest(&self) -> Result<Vec<Signal>> {
        anyhow::bail!("upstream returned 503")
    }
    fn source(&self) -> Source {
        Source::Rss
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

struct MessyProvider;

#[async_trait]
impl SourceProvider for MessyProvider {
    async fn fetch_latest(&self) -> Result<Vec<Signal>> {
        Ok(vec![
            Signal::new(
                Source::Github,
                "m1",
                "<b>DeFi&nbsp;liquidity</b> \u{201C}returns\u{201D}",
                now(),
            ),
            Signal::new(Source::Github, "m2", "   <br/>  ", now()),
        ])
    }
    fn source(&self) -> Source {
        Source::Github
    }
    fn name(&self) -> &'static str {
        "messy"
    }
}

fn fixture_providers() -> Vec<Box<dyn SourceProvider>> {
    vec![
        Box::new(RssProvider::from_fixture("https://research.example.com/feed", FEED_XML)),
        Box::new(GithubProvider::from_fixture("rollup", GITHUB_JSON)),
        Box::new(FarcasterProvider::from_fixture(CASTS_JSON)),
    ]
}

#[tokio::test]
async fn fixtures_flow_into_store() {
    let store = MemoryStore::new();
    let report = narrative_engine::ingest::run_once(&fixture_providers(), &store, now()).await;

    // 2 rss + 2 github + 1 farcaster
    assert_eq!(report.fetched, 5);
    assert_eq!(report.inserted, 5);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.provider_errors, 0);

    let recent = store
        .read_recent(now() - chrono::Duration::hours(48), 100)
        .await
        .unwrap();
    assert_eq!(recent.len(), 5);
    // newest first
    assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    let rss = recent
        .iter()
        .find(|s| s.external_id == "https://research.example.com/p/rollup-season")
        .expect("rss item stored");
    assert_eq!(rss.text, "Layer 2 throughput hit a record & fees dropped.");
}

#[tokio::test]
async fn second_pass_only_reports_duplicates() {
    let store = MemoryStore::new();
    let providers = fixture_providers();
    narrative_engine::ingest::run_once(&providers, &store, now()).await;
    let again = narrative_engine::ingest::run_once(&providers, &store, now()).await;

    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 5);
    assert_eq!(store.signal_count().await, 5);
}

#[tokio::test]
async fn failing_provider_does_not_block_others() {
    let store = MemoryStore::new();
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(BrokenProvider),
        Box::new(GithubProvider::from_fixture("rollup", GITHUB_JSON)),
    ];
    let report = narrative_engine::ingest::run_once(&providers, &store, now()).await;
    assert_eq!(report.provider_errors, 1);
    assert_eq!(report.inserted, 2);
}

#[tokio::test]
async fn text_is_normalized_and_blank_items_dropped() {
    let store = MemoryStore::new();
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(MessyProvider)];
    let report = narrative_engine::ingest::run_once(&providers, &store, now()).await;
    assert_eq!(report.inserted, 1);
    assert_eq!(report.dropped, 1);

    let stored = store.read_recent(now() - chrono::Duration::hours(1), 10).await.unwrap();
    assert_eq!(stored[0].text, r#"DeFi liquidity "returns""#);
}
