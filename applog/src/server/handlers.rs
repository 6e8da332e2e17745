//! HTTP route handlers for the app log server.
//!
//! Handlers are thin: they parse the raw body into JSON, resolve the app's
//! handle from the registry, forward the protocol request, and translate
//! the envelope into an HTTP response. All domain behavior lives behind the
//! dispatch boundary.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use super::metrics::{HttpLabels, HttpMethod, Metrics};
use crate::apps::AppDirectory;
use crate::protocol::{Envelope, ErrorCode, Method, Request};
use crate::registry::StoreRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<StoreRegistry>,
    pub directory: Arc<AppDirectory>,
    pub metrics: Arc<Metrics>,
}

/// Handle POST /api/v1/apps/{app}/log
pub async fn append_log(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Response {
    let envelope = forward(&state, &app, Method::Post, "/log", HashMap::new(), Some(body)).await;
    if envelope.is_success() {
        state.metrics.entries_appended_total.inc();
    }
    respond(&state, HttpMethod::Post, "/log", envelope)
}

/// Handle POST /api/v1/apps/{app}/logs
pub async fn append_logs(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Response {
    let envelope = forward(&state, &app, Method::Post, "/logs", HashMap::new(), Some(body)).await;
    if let Some(entries) = envelope.data().and_then(|d| d.as_array()) {
        state
            .metrics
            .entries_appended_total
            .inc_by(entries.len() as u64);
    }
    respond(&state, HttpMethod::Post, "/logs", envelope)
}

/// Handle GET /api/v1/apps/{app}/logs
pub async fn query_logs(
    State(state): State<AppState>,
    Path(app): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let envelope = forward(&state, &app, Method::Get, "/logs", params, None).await;
    respond(&state, HttpMethod::Get, "/logs", envelope)
}

/// Handle POST /api/v1/apps/{app}/stats
pub async fn increment_stats(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Response {
    let envelope = forward(&state, &app, Method::Post, "/stats", HashMap::new(), Some(body)).await;
    if envelope.is_success() {
        state.metrics.stat_increments_total.inc();
    }
    respond(&state, HttpMethod::Post, "/stats", envelope)
}

/// Handle GET /api/v1/apps/{app}/stats
pub async fn stats_range(
    State(state): State<AppState>,
    Path(app): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let envelope = forward(&state, &app, Method::Get, "/stats", params, None).await;
    respond(&state, HttpMethod::Get, "/stats", envelope)
}

/// Handle POST /api/v1/apps/{app}/prune
pub async fn prune_logs(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Response {
    let envelope = forward(&state, &app, Method::Post, "/prune", HashMap::new(), Some(body)).await;
    if let Some(deleted) = envelope
        .data()
        .and_then(|d| d.get("deleted"))
        .and_then(|d| d.as_u64())
    {
        state.metrics.entries_pruned_total.inc_by(deleted);
    }
    respond(&state, HttpMethod::Post, "/prune", envelope)
}

/// Handle POST /api/v1/apps/{app}/health-urls
pub async fn set_health_urls(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Response {
    let envelope = forward(
        &state,
        &app,
        Method::Post,
        "/health-urls",
        HashMap::new(),
        Some(body),
    )
    .await;
    respond(&state, HttpMethod::Post, "/health-urls", envelope)
}

/// Handle GET /api/v1/apps/{app}/health-urls
pub async fn get_health_urls(State(state): State<AppState>, Path(app): Path<String>) -> Response {
    let envelope = forward(
        &state,
        &app,
        Method::Get,
        "/health-urls",
        HashMap::new(),
        None,
    )
    .await;
    respond(&state, HttpMethod::Get, "/health-urls", envelope)
}

/// Handle POST /api/v1/apps/{app}/health
pub async fn record_health(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Response {
    let envelope = forward(&state, &app, Method::Post, "/health", HashMap::new(), Some(body)).await;
    respond(&state, HttpMethod::Post, "/health", envelope)
}

/// Handle GET /api/v1/apps/{app}/health
pub async fn health_history(
    State(state): State<AppState>,
    Path(app): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let envelope = forward(&state, &app, Method::Get, "/health", params, None).await;
    respond(&state, HttpMethod::Get, "/health", envelope)
}

/// Handle POST /api/v1/apps
pub async fn create_app(State(state): State<AppState>, body: Bytes) -> Response {
    #[derive(Deserialize)]
    struct Body {
        name: String,
    }
    let envelope = match serde_json::from_slice::<Body>(&body) {
        Err(e) => Envelope::error(ErrorCode::BadRequest, format!("invalid JSON body: {}", e)),
        Ok(body) => match state.directory.create(&body.name).await {
            Ok(record) => Envelope::success(&record),
            Err(err) => Envelope::from_error(&err),
        },
    };
    respond(&state, HttpMethod::Post, "/apps", envelope)
}

/// Handle GET /api/v1/apps
pub async fn list_apps(State(state): State<AppState>) -> Response {
    let envelope = match state.directory.list().await {
        Ok(records) => Envelope::success(&records),
        Err(err) => Envelope::from_error(&err),
    };
    respond(&state, HttpMethod::Get, "/apps", envelope)
}

/// Handle DELETE /api/v1/apps/{app}
pub async fn delete_app(State(state): State<AppState>, Path(app): Path<String>) -> Response {
    let envelope = match state.directory.delete(&app).await {
        Ok(()) => Envelope::success(&serde_json::json!({ "deleted": app })),
        Err(err) => Envelope::from_error(&err),
    };
    respond(&state, HttpMethod::Delete, "/apps", envelope)
}

/// Handle GET /metrics
pub async fn handle_metrics(State(state): State<AppState>) -> String {
    state.metrics.encode()
}

/// Handle GET /-/healthy
pub async fn handle_healthy() -> &'static str {
    "OK"
}

/// Handle GET /-/ready
pub async fn handle_ready() -> &'static str {
    "OK"
}

/// Parses the body, resolves the app's handle and forwards the request.
async fn forward(
    state: &AppState,
    app: &str,
    method: Method,
    path: &str,
    query: HashMap<String, String>,
    body: Option<Bytes>,
) -> Envelope {
    let body = match body {
        None => None,
        Some(raw) if raw.is_empty() => None,
        Some(raw) => match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                return Envelope::error(ErrorCode::BadRequest, format!("invalid JSON body: {}", e));
            }
        },
    };

    let handle = match state.registry.handle(app).await {
        Ok(handle) => handle,
        Err(err) => return Envelope::from_error(&err),
    };

    handle
        .dispatch(Request {
            method,
            path: path.to_string(),
            query,
            body,
        })
        .await
}

/// Records the request metric and renders the envelope with its HTTP status.
fn respond(state: &AppState, method: HttpMethod, endpoint: &str, envelope: Envelope) -> Response {
    state
        .metrics
        .http_requests_total
        .get_or_create(&HttpLabels {
            method,
            endpoint: endpoint.to_string(),
            status: envelope.http_status(),
        })
        .inc();
    let status =
        StatusCode::from_u16(envelope.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}
