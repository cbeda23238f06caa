// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod narrative;
pub mod rate_limit;
pub mod signal;
pub mod source_weights;
pub mod store;
pub mod taxonomy;
pub mod telemetry;

// Matcher, per-signal scoring factors, rationale
pub mod analyze;

// Ingest providers and background jobs
pub mod ingest;
pub mod jobs;

// App-idea suggestions per narrative
pub mod ideas;

// ---- Re-exports for stable public API ----
pub use crate::analyze::classify;
pub use crate::api::{router, AppState};
pub use crate::engine::{process, process_at, Engine};
pub use crate::narrative::{Confidence, Evidence, NarrativeMatch, NarrativeScore, ProcessedNarrative};
pub use crate::signal::{Signal, SignalPayload, Source};
pub use crate::taxonomy::{MomentumMode, Taxonomy};
