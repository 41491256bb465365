use crate::config::types::{Config, LinesConfig};
use crate::filter::{AdaptiveFilterFetcher, DebugLineClassifier, FilterRequest};
use crate::sequencer::LogMerger;
use crate::upstream::{LogFetcher, UpstreamError, CORE_LOGS, HOST_LOGS, SUPERVISOR_LOGS};
use crate::web::auth::RequireBearer;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const WARNING_HEADER: &str = "x-loggateway-warning";
pub const TRUNCATED_HEADER: &str = "x-loggateway-truncated";
pub const PATH_HEADER: &str = "x-loggateway-path";

/// Shared state for the gateway API
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn LogFetcher>,
}

impl AppState {
    pub fn new(config: Config, fetcher: Arc<dyn LogFetcher>) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct LinesQuery {
    #[serde(default)]
    pub lines: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Z2mLogsQuery {
    #[serde(default)]
    pub lines: Option<i64>,
    #[serde(default)]
    pub include_debug: bool,
}

/// Validates a requested line count against the configured bounds.
pub fn requested_lines(lines: Option<i64>, limits: &LinesConfig) -> Result<usize, ApiError> {
    let requested = lines.unwrap_or(limits.default);
    if requested <= 0 {
        return Err(ApiError::BadRequest("lines must be positive.".to_string()));
    }
    if requested > limits.max {
        return Err(ApiError::BadRequest(format!(
            "lines must be <= {}.",
            limits.max
        )));
    }
    usize::try_from(requested).map_err(|_| ApiError::BadRequest("lines is out of range.".to_string()))
}

/// GET /healthz
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /logs/system
pub async fn get_system_logs(
    State(state): State<AppState>,
    _auth: RequireBearer,
    Query(query): Query<LinesQuery>,
) -> Result<String, ApiError> {
    let requested = requested_lines(query.lines, &state.config.lines)?;
    Ok(state.fetcher.fetch_lines(HOST_LOGS, requested).await?)
}

/// GET /logs/supervisor
pub async fn get_supervisor_logs(
    State(state): State<AppState>,
    _auth: RequireBearer,
    Query(query): Query<LinesQuery>,
) -> Result<String, ApiError> {
    let requested = requested_lines(query.lines, &state.config.lines)?;
    Ok(state.fetcher.fetch_lines(SUPERVISOR_LOGS, requested).await?)
}

/// GET /logs/core
/// Container logs merged with the local home-assistant.log rotations.
pub async fn get_core_logs(
    State(state): State<AppState>,
    _auth: RequireBearer,
    Query(query): Query<LinesQuery>,
) -> Result<String, ApiError> {
    let requested = requested_lines(query.lines, &state.config.lines)?;
    let candidates = state.config.core_log_candidates();

    let merged = LogMerger::new(state.fetcher.as_ref(), CORE_LOGS, &candidates)
        .merge(requested)
        .await?;

    Ok(merged.to_text())
}

/// GET /logs/z2m?lines=N&include_debug=bool
pub async fn get_z2m_logs(
    State(state): State<AppState>,
    _auth: RequireBearer,
    Query(query): Query<Z2mLogsQuery>,
) -> Result<Response, ApiError> {
    let target = requested_lines(query.lines, &state.config.lines)?;
    let path = state.config.z2m_logs_path();
    let fetcher = AdaptiveFilterFetcher::new(state.fetcher.as_ref(), &path);

    let result = if query.include_debug {
        fetcher.fetch_unfiltered(target).await?
    } else {
        let classifier = DebugLineClassifier::new();
        let request = FilterRequest::new(target, &classifier, state.config.z2m.fetch_cap);
        fetcher.fetch_filtered(&request).await?
    };

    let body = result.to_text();
    Ok(match result.warning {
        Some(warning) => ([(WARNING_HEADER, warning.message())], body).into_response(),
        None => body.into_response(),
    })
}

// Error handling
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    BadGateway(String),
    InternalError(String),
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Unavailable { .. } | UpstreamError::BadStatus { .. } => {
                ApiError::BadGateway(err.to_string())
            }
            UpstreamError::InvalidToken(_) | UpstreamError::Client(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
