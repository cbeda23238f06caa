use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::ingest::providers::{http_client, record_parse};
use crate::ingest::types::SourceProvider;
use crate::signal::{Signal, SignalPayload, Source};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Repository topics searched on every run.
pub const TOPICS: [&str; 6] = ["farcaster", "web3", "defi", "ai-agent", "zk", "restaking"];

const PER_PAGE: u32 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    id: u64,
    name: String,
    #[serde(default)]
    full_name: String,
    description: Option<String>,
    html_url: Option<String>,
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    stargazers_count: u64,
    language: Option<String>,
}

pub struct GithubProvider {
    mode: Mode,
}

enum Mode {
    Fixture { topic: String, body: String },
    Http {
        api_url: String,
        client: reqwest::Client,
    },
}

impl GithubProvider {
    /// Parse a fixed search response as if it came back for `topic`.
    pub fn from_fixture(topic: &str, body: &str) -> Self {
        Self {
            mode: Mode::Fixture {
                topic: topic.to_string(),
                body: body.to_string(),
            },
        }
    }

    pub fn from_url(api_url: &str) -> Self {
        Self {
            mode: Mode::Http {
                api_url: api_url.trim_end_matches('/').to_string(),
                client: http_client(),
            },
        }
    }

    fn parse_repos_from_str(topic: &str, s: &str, now: DateTime<Utc>) -> Result<Vec<Signal>> {
        let t0 = std::time::Instant::now();
        let resp: SearchResponse =
            serde_json::from_str(s).with_context(|| format!("parsing github search for topic {topic}"))?;

        let mut out = Vec::with_capacity(resp.items.len());
        for repo in resp.items {
            let Some(description) = repo.description.filter(|d| !d.trim().is_empty()) else {
                continue;
            };
            let tags = if repo.topics.is_empty() {
                vec![topic.to_string()]
            } else {
                repo.topics
            };

            let mut signal = Signal::new(
                Source::Github,
                repo.id.to_string(),
                description,
                repo.pushed_at.unwrap_or(now),
            )
            .with_title(repo.name)
            .with_tags(tags)
            .with_payload(SignalPayload::Github {
                repo_id: repo.id,
                full_name: repo.full_name,
                stars: repo.stargazers_count,
                language: repo.language,
            });
            if let Some(url) = repo.html_url {
                signal = signal.with_url(url);
            }
            out.push(signal);
        }

        record_parse(t0, out.len());
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for GithubProvider {
    async fn fetch_latest(&self) -> Result<Vec<Signal>> {
        let now = Utc::now();
        match &self.mode {
            Mode::Fixture { topic, body } => Self::parse_repos_from_str(topic, body, now),

            Mode::Http { api_url, client } => {
                let mut out = Vec::new();
                let mut failures = 0usize;
                for topic in TOPICS {
                    let url = format!(
                        "{api_url}/search/repositories?q=topic:{topic}&sort=updated&order=desc&per_page={PER_PAGE}"
                    );
                    let parsed = match fetch_body(client, &url).await {
                        Ok(body) => Self::parse_repos_from_str(topic, &body, now),
                        Err(e) => Err(e),
                    };
                    match parsed {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            failures += 1;
                            tracing::warn!(target: "ingest", error = ?e, topic, "github topic failed");
                            counter!("ingest_provider_errors_total").increment(1);
                        }
                    }
                }
                if failures == TOPICS.len() {
                    anyhow::bail!("all github topic searches failed");
                }
                Ok(out)
            }
        }
    }

    fn source(&self) -> Source {
        Source::Github
    }

    fn name(&self) -> &'static str {
        "github"
    }
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .header("accept", "application/vnd.github+json")
        .send()
        .await
        .context("github http get()")?
        .error_for_status()
        .context("github http status")?;
    resp.text().await.context("github http .text()")
}
