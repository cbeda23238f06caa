// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use crate::ingest::types::{IngestReport, SourceProvider};
use crate::store::SignalStore;

/// Max characters kept from any text field.
pub const MAX_TEXT_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Total items parsed from providers.");
        describe_counter!("ingest_inserted_total", "Signals newly written to the store.");
        describe_counter!(
            "ingest_duplicates_total",
            "Signals skipped because (source, external_id) already existed."
        );
        describe_counter!(
            "ingest_dropped_total",
            "Signals dropped because nothing was left after normalization."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Decode entities, strip tags, ASCII-fy curly quotes, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = RE_TAGS.replace_all(&decoded, " ");

    let quoted = stripped
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    let out = RE_WS.replace_all(&quoted, " ");
    let out = out.trim();

    if out.chars().count() > MAX_TEXT_CHARS {
        out.chars().take(MAX_TEXT_CHARS).collect()
    } else {
        out.to_string()
    }
}

/// Fetch from every provider and write into the store.
///
/// A failing provider is logged and counted; the rest still run. Store errors
/// on a single insert are treated the same way.
pub async fn run_once<S: SignalStore + ?Sized>(
    providers: &[Box<dyn SourceProvider>],
    store: &S,
    now: DateTime<Utc>,
) -> IngestReport {
    ensure_metrics_described();

    let mut report = IngestReport::default();
    for p in providers {
        report.merge(ingest_provider(p.as_ref(), store).await);
    }

    if let Err(e) = store.flush().await {
        tracing::warn!(target: "ingest", error = %e, "store flush failed");
    }

    counter!("ingest_inserted_total").increment(report.inserted as u64);
    counter!("ingest_duplicates_total").increment(report.duplicates as u64);
    counter!("ingest_dropped_total").increment(report.dropped as u64);
    gauge!("ingest_pipeline_last_run_ts").set(now.timestamp() as f64);

    tracing::info!(
        target: "ingest",
        providers = providers.len(),
        fetched = report.fetched,
        inserted = report.inserted,
        duplicates = report.duplicates,
        dropped = report.dropped,
        errors = report.provider_errors,
        "ingest pass done"
    );
    report
}

async fn ingest_provider<S: SignalStore + ?Sized>(
    p: &dyn SourceProvider,
    store: &S,
) -> IngestReport {
    let mut report = IngestReport::default();

    let signals = match p.fetch_latest().await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
            counter!("ingest_provider_errors_total").increment(1);
            report.provider_errors += 1;
            return report;
        }
    };

    report.fetched = signals.len();
    for mut s in signals {
        s.text = normalize_text(&s.text);
        s.title = s
            .title
            .as_deref()
            .map(normalize_text)
            .filter(|t| !t.is_empty());
        if s.combined_text().is_empty() {
            report.dropped += 1;
            continue;
        }

        match store.insert(s).await {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.duplicates += 1,
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, provider = p.name(), "insert failed");
                report.provider_errors += 1;
            }
        }
    }

    tracing::debug!(
        target: "ingest",
        provider = p.name(),
        source = %p.source(),
        fetched = report.fetched,
        inserted = report.inserted,
        "provider done"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_decodes() {
        let s = "  Hello,&nbsp;&nbsp; world!  ";
        assert_eq!(normalize_text(s), "Hello, world!");
    }

    #[test]
    fn normalize_text_strips_tags_and_quotes() {
        let s = "<p>The \u{201C}restaking\u{201D} <b>boom</b></p>";
        assert_eq!(normalize_text(s), "The \"restaking\" boom");
    }

    #[test]
    fn normalize_text_caps_length() {
        let s = "a".repeat(MAX_TEXT_CHARS + 10);
        assert_eq!(normalize_text(&s).chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn report_merge_adds_fields() {
        let mut a = IngestReport {
            fetched: 2,
            inserted: 1,
            duplicates: 1,
            dropped: 0,
            provider_errors: 0,
        };
        a.merge(IngestReport {
            fetched: 3,
            inserted: 2,
            duplicates: 0,
            dropped: 1,
            provider_errors: 1,
        });
        assert_eq!(a.fetched, 5);
        assert_eq!(a.inserted, 3);
        assert_eq!(a.dropped, 1);
        assert_eq!(a.provider_errors, 1);
    }
}
