use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::ingest::providers::{http_client, record_parse};
use crate::ingest::types::SourceProvider;
use crate::signal::{Signal, SignalPayload, Source};

pub const DEFAULT_HUB_URL: &str = "https://hub.pinata.cloud";

/// Accounts whose recent casts are polled.
pub const DEFAULT_FIDS: [u64; 7] = [2, 3, 5, 602, 1048, 3621, 6023];

/// A cast is kept only if its lowercased text contains one of these.
pub const PREFILTER_KEYWORDS: [&str; 9] = [
    "ai", "agent", "agents", "defi", "restaking", "rollup", "layer 2", "l2", "farcaster",
];

/// Hub timestamps count seconds from 2021-01-01T00:00:00Z.
pub const FARCASTER_EPOCH: i64 = 1_609_459_200;

const PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
struct CastsResponse {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    hash: Option<String>,
    data: Option<MessageData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageData {
    fid: Option<u64>,
    timestamp: Option<i64>,
    cast_add_body: Option<CastAddBody>,
}

#[derive(Debug, Deserialize)]
struct CastAddBody {
    text: Option<String>,
}

fn passes_prefilter(text: &str) -> bool {
    let lower = text.to_lowercase();
    PREFILTER_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn from_farcaster_time(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(FARCASTER_EPOCH.checked_add(ts)?, 0)
}

pub struct FarcasterProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        hub_url: String,
        fids: Vec<u64>,
        client: reqwest::Client,
    },
}

impl FarcasterProvider {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(hub_url: &str) -> Self {
        Self::with_fids(hub_url, DEFAULT_FIDS.to_vec())
    }

    pub fn with_fids(hub_url: &str, fids: Vec<u64>) -> Self {
        Self {
            mode: Mode::Http {
                hub_url: hub_url.trim_end_matches('/').to_string(),
                fids,
                client: http_client(),
            },
        }
    }

    fn parse_casts_from_str(s: &str, now: DateTime<Utc>) -> Result<Vec<Signal>> {
        let t0 = std::time::Instant::now();
        let resp: CastsResponse = serde_json::from_str(s).context("parsing farcaster casts")?;

        let mut out = Vec::with_capacity(resp.messages.len());
        for msg in resp.messages {
            let (Some(hash), Some(data)) = (msg.hash, msg.data) else {
                continue;
            };
            let Some(text) = data.cast_add_body.and_then(|b| b.text) else {
                continue;
            };
            if text.trim().is_empty() || !passes_prefilter(&text) {
                continue;
            }

            let fid = data.fid.unwrap_or_default();
            let timestamp = data.timestamp.and_then(from_farcaster_time).unwrap_or(now);
            out.push(
                Signal::new(Source::Farcaster, hash.clone(), text, timestamp)
                    .with_url(format!("https://warpcast.com/{fid}/{hash}"))
                    .with_payload(SignalPayload::Farcaster { fid, hash }),
            );
        }

        record_parse(t0, out.len());
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for FarcasterProvider {
    async fn fetch_latest(&self) -> Result<Vec<Signal>> {
        let now = Utc::now();
        match &self.mode {
            Mode::Fixture(s) => Self::parse_casts_from_str(s, now),

            Mode::Http {
                hub_url,
                fids,
                client,
            } => {
                let mut out = Vec::new();
                let mut failures = 0usize;
                for fid in fids {
                    let url = format!(
                        "{hub_url}/v1/castsByFid?fid={fid}&pageSize={PAGE_SIZE}&reverse=true"
                    );
                    let parsed = match fetch_body(client, &url).await {
                        Ok(body) => Self::parse_casts_from_str(&body, now),
                        Err(e) => Err(e),
                    };
                    match parsed {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(target: "ingest", error = ?e, fid, "farcaster fid failed");
                            counter!("ingest_provider_errors_total").increment(1);
                        }
                    }
                }
                if failures > 0 && failures == fids.len() {
                    anyhow::bail!("all {failures} farcaster fids failed");
                }
                Ok(out)
            }
        }
    }

    fn source(&self) -> Source {
        Source::Farcaster
    }

    fn name(&self) -> &'static str {
        "farcaster"
    }
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .context("farcaster http get()")?
        .error_for_status()
        .context("farcaster http status")?;
    resp.text().await.context("farcaster http .text()")
}
