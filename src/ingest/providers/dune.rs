use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::ingest::providers::{http_client, record_parse};
use crate::ingest::types::SourceProvider;
use crate::signal::{Signal, SignalPayload, Source};

pub const DEFAULT_API_URL: &str = "https://api.dune.com/api/v1";
pub const DEFAULT_QUERY_ID: u64 = 6_434_209;

const TITLE: &str = "Layer-2 Activity Trend (30d)";
const TEXT: &str =
    "On-chain Layer-2 activity based on transactions and active addresses over the last 30 days.";
const TAGS: [&str; 4] = ["l2", "layer2", "onchain", "scaling"];

pub struct DuneProvider {
    query_id: u64,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        api_url: String,
        api_key: String,
        client: reqwest::Client,
    },
    /// No API key configured.
    Disabled,
}

impl DuneProvider {
    pub fn from_fixture(query_id: u64, body: &str) -> Self {
        Self {
            query_id,
            mode: Mode::Fixture(body.to_string()),
        }
    }

    /// HTTP mode when `api_key` is present, otherwise a provider that yields nothing.
    pub fn new(api_url: &str, api_key: Option<String>, query_id: u64) -> Self {
        let mode = match api_key.filter(|k| !k.trim().is_empty()) {
            Some(api_key) => Mode::Http {
                api_url: api_url.trim_end_matches('/').to_string(),
                api_key,
                client: http_client(),
            },
            None => Mode::Disabled,
        };
        Self { query_id, mode }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.mode, Mode::Disabled)
    }

    /// One summary signal per query result.
    fn signal_from_str(query_id: u64, s: &str, now: DateTime<Utc>) -> Result<Signal> {
        let t0 = std::time::Instant::now();
        let v: Value = serde_json::from_str(s).context("parsing dune query result")?;
        let row_count = v
            .pointer("/result/rows")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or_default();

        let signal = Signal::new(Source::Dune, query_id.to_string(), TEXT, now)
            .with_title(TITLE)
            .with_url(format!("https://dune.com/queries/{query_id}"))
            .with_tags(TAGS.iter().map(|t| t.to_string()).collect())
            .with_payload(SignalPayload::Dune {
                query_id,
                row_count,
            });
        record_parse(t0, 1);
        Ok(signal)
    }
}

#[async_trait]
impl SourceProvider for DuneProvider {
    async fn fetch_latest(&self) -> Result<Vec<Signal>> {
        let now = Utc::now();
        match &self.mode {
            Mode::Fixture(s) => Ok(vec![Self::signal_from_str(self.query_id, s, now)?]),

            Mode::Http {
                api_url,
                api_key,
                client,
            } => {
                let url = format!("{api_url}/query/{}/results", self.query_id);
                let body = client
                    .get(&url)
                    .header("x-dune-api-key", api_key)
                    .send()
                    .await
                    .context("dune http get()")?
                    .error_for_status()
                    .context("dune http status")?
                    .text()
                    .await
                    .context("dune http .text()")?;
                Ok(vec![Self::signal_from_str(self.query_id, &body, now)?])
            }

            Mode::Disabled => {
                tracing::debug!(target: "ingest", "dune skipped: no api key");
                Ok(Vec::new())
            }
        }
    }

    fn source(&self) -> Source {
        Source::Dune
    }

    fn name(&self) -> &'static str {
        "dune"
    }
}
