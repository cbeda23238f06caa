//! # Signals
//! One ingested item of text from a source, identified per source by `external_id`.
//!
//! Signals are immutable once ingested; the engine only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Originating source of a signal. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Dune,
    Rss,
    Github,
    Farcaster,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Dune, Source::Rss, Source::Github, Source::Farcaster];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Dune => "dune",
            Source::Rss => "rss",
            Source::Github => "github",
            Source::Farcaster => "farcaster",
        }
    }

    /// Human-readable description used in rationales.
    pub fn description(&self) -> &'static str {
        match self {
            Source::Dune => "on-chain data",
            Source::Rss => "news coverage",
            Source::Github => "developer activity",
            Source::Farcaster => "social discussion",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dune" => Ok(Source::Dune),
            "rss" => Ok(Source::Rss),
            "github" => Ok(Source::Github),
            "farcaster" => Ok(Source::Farcaster),
            _ => Err(UnknownSource(s.to_string())),
        }
    }
}

/// Source-specific metadata captured at ingest time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SignalPayload {
    Dune {
        query_id: u64,
        row_count: usize,
    },
    Rss {
        feed_url: String,
        #[serde(default)]
        author: Option<String>,
    },
    Github {
        repo_id: u64,
        full_name: String,
        stars: u64,
        #[serde(default)]
        language: Option<String>,
    },
    Farcaster {
        fid: u64,
        hash: String,
    },
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub source: Source,
    pub external_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub payload: SignalPayload,
}

impl Signal {
    pub fn new(
        source: Source,
        external_id: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            external_id: external_id.into(),
            title: None,
            text: text.into(),
            url: None,
            timestamp,
            tags: Vec::new(),
            payload: SignalPayload::None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_payload(mut self, payload: SignalPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Title and text joined by a space, trimmed. Empty means nothing to classify.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title.as_deref().unwrap_or_default(), self.text)
            .trim()
            .to_string()
    }

    /// Store identity key.
    pub fn identity(&self) -> (Source, &str) {
        (self.source, self.external_id.as_str())
    }
}
