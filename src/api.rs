use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::ideas;
use crate::jobs::{JobBoard, JobKind, JobStatus};
use crate::narrative::{NarrativeMatch, ProcessedNarrative};
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::signal::Signal;
use crate::store::{MemoryStore, NarrativeStore, Store, StoreError};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

const X_CACHE: &str = "x-cache";
const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub engine: Arc<Engine>,
    pub jobs: Arc<JobBoard>,
    pub cache: Arc<TtlCache<String>>,
    pub ideas_cache: Arc<TtlCache<String>>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, engine: Arc<Engine>, jobs: Arc<JobBoard>, cfg: &AppConfig) -> Self {
        Self {
            store,
            engine,
            jobs,
            cache: Arc::new(TtlCache::new("narratives", cfg.narratives_cache_ttl)),
            ideas_cache: Arc::new(TtlCache::new("ideas", cfg.ideas_cache_ttl)),
            limiter: Arc::new(RateLimiter::per_minute(cfg.rate_limit_per_minute)),
        }
    }

    /// Fresh in-memory state with default settings.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Engine::default()),
            Arc::new(JobBoard::new()),
            &AppConfig::default(),
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests from this IP, please try again later.")]
    RateLimited { retry_after_secs: u64 },

    #[error("Internal server error while {context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Internal server error")]
    Internal(#[from] serde_json::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Store { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(target: "api", error = ?self, "request failed");
        }
        let mut resp = (status, Json(ErrorBody { error: self.to_string() })).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        resp
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/narratives", get(list_narratives))
        .route("/narratives/{name}", get(get_narrative))
        .route("/classify", post(classify))
        .route("/process", post(process))
        .route("/ideas", get(list_ideas))
        .route("/ideas/{id}", get(get_idea))
        .route("/jobs/status", get(jobs_status))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Client key: first `x-forwarded-for` hop, else "anonymous".
fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(req.headers());
    let (mut resp, remaining) = match state.limiter.check(&key) {
        RateDecision::Allowed { remaining } => {
            counter!("api_requests_total").increment(1);
            (next.run(req).await, remaining)
        }
        RateDecision::Limited { retry_after } => {
            counter!("api_rate_limited_total").increment(1);
            tracing::warn!(target: "api", client = %key, "rate limited");
            let resp = ApiError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response();
            (resp, 0)
        }
    };
    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static(RATELIMIT_LIMIT),
        HeaderValue::from(state.limiter.max()),
    );
    headers.insert(
        HeaderName::from_static(RATELIMIT_REMAINING),
        HeaderValue::from(remaining),
    );
    resp
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} {} not found", method, uri.path()))
}

fn parse_positive(raw: &str, field: &str) -> Result<usize, ApiError> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid {field}. Must be a positive integer."
        ))),
    }
}

/// `limit` query: absent or empty gives the default, otherwise a positive integer capped at 50.
fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(DEFAULT_LIMIT),
        Some(raw) => Ok(parse_positive(raw, "limit")?.min(MAX_LIMIT)),
    }
}

fn json_with_cache_header(body: String, hit: bool) -> Response {
    let flag = HeaderValue::from_static(if hit { "HIT" } else { "MISS" });
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (HeaderName::from_static(X_CACHE), flag),
        ],
        body,
    )
        .into_response()
}

async fn list_narratives(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let limit = parse_limit(q.get("limit").map(String::as_str))?;

    // Keyed on the parsed limit so unrelated query params share one entry.
    let key = format!("narratives?limit={limit}");
    if let Some(body) = state.cache.get(&key) {
        return Ok(json_with_cache_header(body, true));
    }

    let rows = state
        .store
        .list(limit)
        .await
        .map_err(|source| ApiError::Store {
            context: "fetching narratives",
            source,
        })?;
    let body = serde_json::to_string(&rows)?;
    state.cache.insert(key, body.clone());
    Ok(json_with_cache_header(body, false))
}

async fn get_narrative(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let key = format!("narratives/{name}");
    if let Some(body) = state.cache.get(&key) {
        return Ok(json_with_cache_header(body, true));
    }

    let row = state
        .store
        .get(&name)
        .await
        .map_err(|source| ApiError::Store {
            context: "fetching narrative",
            source,
        })?
        .ok_or_else(|| ApiError::NotFound("Narrative not found".to_string()))?;
    let body = serde_json::to_string(&row)?;
    state.cache.insert(key, body.clone());
    Ok(json_with_cache_header(body, false))
}

#[derive(Serialize)]
struct IdeasResp<'a> {
    total: usize,
    ideas: &'a [ideas::AppIdeaWithTemplate],
}

async fn list_ideas(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let limit = parse_limit(q.get("limit").map(String::as_str))?;

    let key = format!("ideas?limit={limit}");
    if let Some(body) = state.ideas_cache.get(&key) {
        return Ok(json_with_cache_header(body, true));
    }

    let all = ideas::ideas_for_top(state.store.as_ref(), limit)
        .await
        .map_err(|source| ApiError::Store {
            context: "generating app ideas",
            source,
        })?;
    let body = serde_json::to_string(&IdeasResp {
        total: all.len(),
        ideas: &all,
    })?;
    state.ideas_cache.insert(key, body.clone());
    Ok(json_with_cache_header(body, false))
}

async fn get_idea(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_positive(&raw_id, "idea ID")?;

    let key = format!("ideas/{id}");
    if let Some(body) = state.ideas_cache.get(&key) {
        return Ok(json_with_cache_header(body, true));
    }

    let idea = ideas::idea_by_id(state.store.as_ref(), id)
        .await
        .map_err(|source| ApiError::Store {
            context: "fetching app idea",
            source,
        })?
        .ok_or_else(|| ApiError::NotFound("App idea not found".to_string()))?;
    let body = serde_json::to_string(&idea)?;
    state.ideas_cache.insert(key, body.clone());
    Ok(json_with_cache_header(body, false))
}

#[derive(Deserialize)]
struct ClassifyReq {
    text: String,
}

async fn classify(
    State(state): State<AppState>,
    body: Result<Json<ClassifyReq>, JsonRejection>,
) -> Result<Json<Option<NarrativeMatch>>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(state.engine.classify(&req.text)))
}

#[derive(Deserialize)]
struct ProcessQuery {
    /// Frozen clock (RFC 3339); defaults to now.
    at: Option<DateTime<Utc>>,
}

async fn process(
    State(state): State<AppState>,
    q: Result<Query<ProcessQuery>, axum::extract::rejection::QueryRejection>,
    body: Result<Json<Vec<Signal>>, JsonRejection>,
) -> Result<Json<Vec<ProcessedNarrative>>, ApiError> {
    let Query(q) = q.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let Json(signals) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let now = q.at.unwrap_or_else(Utc::now);
    Ok(Json(state.engine.process_at(&signals, now)))
}

#[derive(Serialize)]
struct JobsResp {
    status: &'static str,
    jobs: std::collections::BTreeMap<JobKind, JobStatus>,
}

async fn jobs_status(State(state): State<AppState>) -> Json<JobsResp> {
    Json(JobsResp {
        status: "active",
        jobs: state.jobs.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_parsing() {
        assert_eq!(parse_limit(None).unwrap(), 10);
        assert_eq!(parse_limit(Some("")).unwrap(), 10);
        assert_eq!(parse_limit(Some("3")).unwrap(), 3);
        assert_eq!(parse_limit(Some("500")).unwrap(), 50);
        assert!(parse_limit(Some("0")).is_err());
        assert!(parse_limit(Some("-4")).is_err());
        assert!(parse_limit(Some("ten")).is_err());
    }

    #[test]
    fn positive_id_parsing_names_the_field() {
        assert_eq!(parse_positive(" 3 ", "idea ID").unwrap(), 3);
        let err = parse_positive("0", "idea ID").unwrap_err();
        assert_eq!(err.to_string(), "Invalid idea ID. Must be a positive integer.");
        assert!(parse_positive("2.5", "idea ID").is_err());
    }

    #[test]
    fn client_key_prefers_first_forwarded_hop() {
        let mut h = HeaderMap::new();
        assert_eq!(client_key(&h), "anonymous");
        h.insert("x-forwarded-for", HeaderValue::from_static(" 1.2.3.4 , 10.0.0.1"));
        assert_eq!(client_key(&h), "1.2.3.4");
    }
}
