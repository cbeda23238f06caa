// src/config/mod.rs
//! Service configuration from the environment (after `dotenvy` has loaded `.env`).

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::ingest::config::load_feeds_default;
use crate::ingest::providers::{dune, farcaster, github};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON snapshot for the in-memory store; `None` keeps everything in memory.
    pub store_path: Option<PathBuf>,
    pub dune_api_key: Option<String>,
    pub dune_api_url: String,
    pub dune_query_id: u64,
    pub farcaster_hub_url: String,
    pub github_api_url: String,
    pub rss_feeds: Vec<String>,
    pub scheduler_enabled: bool,
    pub narratives_cache_ttl: Duration,
    pub ideas_cache_ttl: Duration,
    pub rate_limit_per_minute: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            dune_api_key: None,
            dune_api_url: dune::DEFAULT_API_URL.to_string(),
            dune_query_id: dune::DEFAULT_QUERY_ID,
            farcaster_hub_url: farcaster::DEFAULT_HUB_URL.to_string(),
            github_api_url: github::DEFAULT_API_URL.to_string(),
            rss_feeds: crate::ingest::providers::rss::DEFAULT_FEEDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            scheduler_enabled: true,
            narratives_cache_ttl: Duration::from_secs(300),
            ideas_cache_ttl: Duration::from_secs(600),
            rate_limit_per_minute: 100,
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(v) => v
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid {name}={v:?}")),
        None => Ok(default),
    }
}

fn flag(name: &str, default: bool) -> bool {
    match var(name).map(|v| v.to_ascii_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            store_path: var("NARRATIVE_STORE_PATH").map(PathBuf::from),
            dune_api_key: var("DUNE_API_KEY"),
            dune_api_url: var("DUNE_API_URL").unwrap_or(d.dune_api_url),
            dune_query_id: parsed("DUNE_QUERY_ID", d.dune_query_id)?,
            farcaster_hub_url: var("FARCASTER_HUB_URL").unwrap_or(d.farcaster_hub_url),
            github_api_url: var("GITHUB_API_URL").unwrap_or(d.github_api_url),
            rss_feeds: load_feeds_default().context("loading rss feed list")?,
            scheduler_enabled: flag("SCHEDULER_ENABLED", d.scheduler_enabled),
            narratives_cache_ttl: Duration::from_secs(parsed(
                "NARRATIVES_CACHE_TTL_SECS",
                d.narratives_cache_ttl.as_secs(),
            )?),
            ideas_cache_ttl: Duration::from_secs(parsed(
                "IDEAS_CACHE_TTL_SECS",
                d.ideas_cache_ttl.as_secs(),
            )?),
            rate_limit_per_minute: parsed("RATE_LIMIT_PER_MINUTE", d.rate_limit_per_minute)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "NARRATIVE_STORE_PATH",
        "DUNE_API_KEY",
        "DUNE_QUERY_ID",
        "SCHEDULER_ENABLED",
        "NARRATIVES_CACHE_TTL_SECS",
        "IDEAS_CACHE_TTL_SECS",
        "RATE_LIMIT_PER_MINUTE",
    ];

    fn clear() {
        for v in VARS {
            env::remove_var(v);
        }
    }

    #[serial_test::serial]
    #[test]
    fn defaults_without_env() {
        clear();
        let cfg = AppConfig::from_env().unwrap();
        assert!(cfg.store_path.is_none());
        assert!(cfg.dune_api_key.is_none());
        assert_eq!(cfg.dune_query_id, 6_434_209);
        assert!(cfg.scheduler_enabled);
        assert_eq!(cfg.narratives_cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.ideas_cache_ttl, Duration::from_secs(600));
        assert_eq!(cfg.rate_limit_per_minute, 100);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_validation() {
        clear();
        env::set_var("DUNE_API_KEY", " key ");
        env::set_var("SCHEDULER_ENABLED", "false");
        env::set_var("RATE_LIMIT_PER_MINUTE", "7");
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.dune_api_key.as_deref(), Some("key"));
        assert!(!cfg.scheduler_enabled);
        assert_eq!(cfg.rate_limit_per_minute, 7);

        env::set_var("DUNE_QUERY_ID", "abc");
        let err = AppConfig::from_env().unwrap_err();
        assert!(format!("{err:#}").contains("DUNE_QUERY_ID"));
        clear();
    }
}
