// src/jobs/mod.rs
//! Background jobs: ingest per source, narrative processing, retention cleanup.
//!
//! `JobBoard` is the only shared job state. It is owned by whoever spawns the
//! scheduler and handed to the API for `/jobs/status`.

pub mod runner;
pub mod scheduler;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

pub use runner::{run_job, run_narratives, JobContext, JobOutcome, NarrativeRunReport};
pub use scheduler::spawn_scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Farcaster,
    Rss,
    Github,
    Dune,
    Narratives,
    Cleanup,
}

impl JobKind {
    pub const ALL: [JobKind; 6] = [
        JobKind::Farcaster,
        JobKind::Rss,
        JobKind::Github,
        JobKind::Dune,
        JobKind::Narratives,
        JobKind::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Farcaster => "farcaster",
            JobKind::Rss => "rss",
            JobKind::Github => "github",
            JobKind::Dune => "dune",
            JobKind::Narratives => "narratives",
            JobKind::Cleanup => "cleanup",
        }
    }

    pub fn interval(&self) -> Duration {
        match self {
            JobKind::Farcaster => Duration::from_secs(3 * 60),
            JobKind::Rss => Duration::from_secs(45 * 60),
            JobKind::Github => Duration::from_secs(35 * 60),
            JobKind::Dune => Duration::from_secs(6 * 3600),
            JobKind::Narratives => Duration::from_secs(10 * 60),
            JobKind::Cleanup => Duration::from_secs(24 * 3600),
        }
    }

    /// Delay before the first run. Farcaster warms up quickly; the rest wait a full period.
    pub fn initial_delay(&self) -> Duration {
        match self {
            JobKind::Farcaster => Duration::from_secs(10),
            other => other.interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub status: JobState,
    #[serde(rename = "lastRun")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(rename = "lastError", skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            status: JobState::Idle,
            last_run: None,
            last_error: None,
        }
    }
}

/// Per-job status with at-most-one-running enforcement.
#[derive(Debug)]
pub struct JobBoard {
    inner: Mutex<BTreeMap<JobKind, JobStatus>>,
}

impl Default for JobBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl JobBoard {
    pub fn new() -> Self {
        let map = JobKind::ALL
            .into_iter()
            .map(|k| (k, JobStatus::default()))
            .collect();
        Self {
            inner: Mutex::new(map),
        }
    }

    /// Mark `kind` as running. Returns `false` if it already is.
    pub fn try_start(&self, kind: JobKind) -> bool {
        let mut map = self.inner.lock().expect("job board mutex poisoned");
        let entry = map.entry(kind).or_default();
        if entry.status == JobState::Running {
            return false;
        }
        entry.status = JobState::Running;
        true
    }

    /// Record the end of a run. Success refreshes `last_run`; failure keeps the previous one.
    pub fn finish(&self, kind: JobKind, result: Result<(), String>, now: DateTime<Utc>) {
        let mut map = self.inner.lock().expect("job board mutex poisoned");
        let entry = map.entry(kind).or_default();
        match result {
            Ok(()) => {
                entry.status = JobState::Idle;
                entry.last_run = Some(now);
                entry.last_error = None;
            }
            Err(e) => {
                entry.status = JobState::Error;
                entry.last_error = Some(e);
            }
        }
    }

    pub fn status(&self, kind: JobKind) -> JobStatus {
        let map = self.inner.lock().expect("job board mutex poisoned");
        map.get(&kind).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self) -> BTreeMap<JobKind, JobStatus> {
        self.inner.lock().expect("job board mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_concurrent_run_of_same_job() {
        let board = JobBoard::new();
        assert!(board.try_start(JobKind::Rss));
        assert!(!board.try_start(JobKind::Rss));
        // Other jobs are independent.
        assert!(board.try_start(JobKind::Github));

        board.finish(JobKind::Rss, Ok(()), Utc::now());
        assert!(board.try_start(JobKind::Rss));
    }

    #[test]
    fn error_keeps_last_successful_run() {
        let board = JobBoard::new();
        let t1 = Utc::now();
        board.try_start(JobKind::Dune);
        board.finish(JobKind::Dune, Ok(()), t1);

        board.try_start(JobKind::Dune);
        board.finish(JobKind::Dune, Err("http 500".into()), t1 + chrono::Duration::hours(6));

        let st = board.status(JobKind::Dune);
        assert_eq!(st.status, JobState::Error);
        assert_eq!(st.last_run, Some(t1));
        assert_eq!(st.last_error.as_deref(), Some("http 500"));

        // An errored job may be started again.
        assert!(board.try_start(JobKind::Dune));
    }

    #[test]
    fn snapshot_serializes_every_job() {
        let board = JobBoard::new();
        let v = serde_json::to_value(board.snapshot()).unwrap();
        for k in JobKind::ALL {
            assert_eq!(v[k.as_str()]["status"], "idle");
            assert!(v[k.as_str()]["lastRun"].is_null());
        }
    }

    #[test]
    fn intervals_match_schedule() {
        assert_eq!(JobKind::Farcaster.interval().as_secs(), 180);
        assert_eq!(JobKind::Narratives.interval().as_secs(), 600);
        assert_eq!(JobKind::Cleanup.interval().as_secs(), 86_400);
        assert_eq!(JobKind::Farcaster.initial_delay().as_secs(), 10);
        assert_eq!(JobKind::Dune.initial_delay(), JobKind::Dune.interval());
    }
}
