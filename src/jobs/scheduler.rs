// src/jobs/scheduler.rs
use chrono::Utc;
use metrics::gauge;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::{run_job, JobBoard, JobContext, JobKind};

/// Spawn one ticker task per job. Each tick runs the job unless the previous
/// run of the same job is still in flight.
pub fn spawn_scheduler(ctx: Arc<JobContext>, board: Arc<JobBoard>) -> Vec<JoinHandle<()>> {
    JobKind::ALL
        .into_iter()
        .map(|kind| spawn_job(kind, ctx.clone(), board.clone()))
        .collect()
}

fn spawn_job(kind: JobKind, ctx: Arc<JobContext>, board: Arc<JobBoard>) -> JoinHandle<()> {
    tracing::info!(
        target: "jobs",
        job = kind.as_str(),
        every_secs = kind.interval().as_secs(),
        "job scheduled"
    );
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + kind.initial_delay(), kind.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let now = Utc::now();
            // Errors are already logged and recorded on the board.
            let _ = run_job(&ctx, &board, kind, now).await;
            gauge!("jobs_last_tick_ts", "job" => kind.as_str()).set(now.timestamp() as f64);
        }
    })
}
