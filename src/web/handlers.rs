//! HTTP request handlers.

use super::AppState;
use crate::directory::{DirectoryError, SearchFilter};
use crate::ops::{default_sections, OpsError, Prober};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const MISSING_BASE_URL: &str = "WAVEGATE_OPS_BASE_URL is not configured";

/// Cache hint attached to successful directory responses.
const DIRECTORY_CACHE_CONTROL: &str = "public, max-age=3600";

// ============================================================================
// Error envelope
// ============================================================================

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn ops_error(err: OpsError) -> Response {
    let status = match &err {
        OpsError::MissingToken => StatusCode::UNAUTHORIZED,
        OpsError::Upstream { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        OpsError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    error_json(status, err.to_string())
}

fn directory_error(err: DirectoryError) -> Response {
    error_json(StatusCode::BAD_GATEWAY, err.to_string())
}

fn require_prober(state: &AppState) -> Result<Arc<Prober>, Response> {
    state
        .prober
        .clone()
        .ok_or_else(|| error_json(StatusCode::INTERNAL_SERVER_ERROR, MISSING_BASE_URL))
}

fn cached_json<T: Serialize>(body: &T) -> Response {
    (
        [(header::CACHE_CONTROL, DIRECTORY_CACHE_CONTROL)],
        Json(body),
    )
        .into_response()
}

// ============================================================================
// Operations proxies
// ============================================================================

pub async fn handle_health(State(state): State<AppState>) -> Response {
    let prober = match require_prober(&state) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match prober.proxy_json("/health", false).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => ops_error(e),
    }
}

pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    let prober = match require_prober(&state) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match prober.proxy_json("/admin/api/metrics", true).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => ops_error(e),
    }
}

pub async fn handle_logs(State(state): State<AppState>) -> Response {
    let prober = match require_prober(&state) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match prober.fetch_log_lines().await {
        Ok(lines) => Json(json!({ "lines": lines })).into_response(),
        Err(e) => ops_error(e),
    }
}

pub async fn handle_ops_status(State(state): State<AppState>) -> Response {
    let prober = match require_prober(&state) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let report = prober.run_sections(&default_sections()).await;
    Json(report).into_response()
}

// ============================================================================
// Station directory
// ============================================================================

pub async fn handle_station_search(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Response {
    // Name lookups use the dedicated operation with its smaller page size.
    let result = match filter.name.clone() {
        Some(name) => {
            state
                .directory
                .search_by_name(&name, filter.limit.unwrap_or(50))
                .await
        }
        None => state.directory.search_stations(filter).await,
    };

    match result {
        Ok(cards) => cached_json(&cards),
        Err(e) => directory_error(e),
    }
}

pub async fn handle_station_countries(State(state): State<AppState>) -> Response {
    match state.directory.countries().await {
        Ok(countries) => cached_json(&countries),
        Err(e) => directory_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

pub async fn handle_station_tags(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Response {
    match state.directory.tags(query.limit.unwrap_or(50)).await {
        Ok(tags) => cached_json(&tags),
        Err(e) => directory_error(e),
    }
}

pub async fn handle_station_languages(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Response {
    match state.directory.languages(query.limit.unwrap_or(50)).await {
        Ok(languages) => cached_json(&languages),
        Err(e) => directory_error(e),
    }
}

pub async fn handle_station_click(
    State(state): State<AppState>,
    Path(stationuuid): Path<String>,
) -> Response {
    match state.directory.track_click(&stationuuid).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => directory_error(e),
    }
}
