use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::providers::{http_client, record_parse};
use crate::ingest::types::SourceProvider;
use crate::signal::{Signal, SignalPayload, Source};

/// Feeds polled when no feed list is configured.
pub const DEFAULT_FEEDS: [&str; 2] = [
    "https://electriccapital.substack.com/feed",
    "https://a16zcrypto.substack.com/feed",
];

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    author: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let odt = OffsetDateTime::parse(ts.trim(), &Rfc2822).ok()?;
    DateTime::from_timestamp(odt.unix_timestamp(), odt.nanosecond())
}

pub struct RssProvider {
    mode: Mode,
}

enum Mode {
    Fixture { feed_url: String, body: String },
    Http {
        feeds: Vec<String>,
        client: reqwest::Client,
    },
}

impl RssProvider {
    /// Parse a fixed body instead of fetching; `feed_url` is recorded in payloads.
    pub fn from_fixture(feed_url: &str, body: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                feed_url: feed_url.to_string(),
                body: body.to_string(),
            },
        }
    }

    pub fn from_feeds(feeds: Vec<String>) -> Self {
        Self {
            mode: Mode::Http {
                feeds,
                client: http_client(),
            },
        }
    }

    fn parse_items_from_str(feed_url: &str, s: &str, now: DateTime<Utc>) -> Result<Vec<Signal>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).with_context(|| format!("parsing rss xml from {feed_url}"))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let (Some(link), Some(title)) = (it.link, it.title) else {
                continue;
            };
            let link = link.trim().to_string();
            if link.is_empty() || title.trim().is_empty() {
                continue;
            }

            let timestamp = it
                .pub_date
                .as_deref()
                .and_then(parse_rfc2822)
                .unwrap_or(now);

            out.push(
                Signal::new(
                    Source::Rss,
                    link.clone(),
                    crate::ingest::normalize_text(it.description.as_deref().unwrap_or_default()),
                    timestamp,
                )
                .with_title(crate::ingest::normalize_text(&title))
                .with_url(link)
                .with_payload(SignalPayload::Rss {
                    feed_url: feed_url.to_string(),
                    author: it.author,
                }),
            );
        }

        record_parse(t0, out.len());
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Signal>> {
        let now = Utc::now();
        match &self.mode {
            Mode::Fixture { feed_url, body } => Self::parse_items_from_str(feed_url, body, now),

            Mode::Http { feeds, client } => {
                let mut out = Vec::new();
                let mut failures = 0usize;
                for url in feeds {
                    let body = match fetch_body(client, url).await {
                        Ok(b) => b,
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(target: "ingest", error = ?e, feed = %url, "feed fetch failed");
                            counter!("ingest_provider_errors_total").increment(1);
                            continue;
                        }
                    };
                    match Self::parse_items_from_str(url, &body, now) {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(target: "ingest", error = ?e, feed = %url, "feed parse failed");
                            counter!("ingest_provider_errors_total").increment(1);
                        }
                    }
                }
                if failures > 0 && failures == feeds.len() {
                    anyhow::bail!("all {failures} rss feeds failed");
                }
                Ok(out)
            }
        }
    }

    fn source(&self) -> Source {
        Source::Rss
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .context("rss http get()")?
        .error_for_status()
        .context("rss http status")?;
    resp.text().await.context("rss http .text()")
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
