//! HTTP surface: the Chaport webhook, operator-reply reporting, and health.

use crate::watchdog::Watchdog;
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};
use vigil_core::{config::ApiConfig, message::ConversationId};

const SECRET_HEADER: &str = "x-webhook-secret";

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    watchdog: Arc<Watchdog>,
    secret: Option<String>,
}

impl ApiState {
    pub fn new(watchdog: Arc<Watchdog>, config: &ApiConfig) -> Self {
        let secret = if config.webhook_secret.is_empty() {
            None
        } else {
            Some(config.webhook_secret.clone())
        };
        Self { watchdog, secret }
    }
}

type ApiError = (StatusCode, Json<Value>);

/// Constant-time string comparison for the shared secret.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Returns `Err` with a 401 response when a secret is configured and the
/// request does not carry it.
fn check_secret(headers: &HeaderMap, secret: &Option<String>) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if constant_time_eq(provided, secret) {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        ))
    }
}

/// `GET /`
async fn index() -> &'static str {
    "Chaport auto-reply bot is running"
}

/// `GET /api/health`
async fn health(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.watchdog.uptime_secs(),
        "conversations": state.watchdog.conversations(),
        "active_polls": state.watchdog.active_polls(),
    }))
}

/// `POST /chaport/webhook`
async fn webhook(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    check_secret(&headers, &state.secret)?;

    let Json(payload) = body.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("invalid request: {e}")})),
        )
    })?;

    let outcome = state.watchdog.ingest(&payload);
    debug!("api: webhook {}", outcome.status());
    Ok(Json(json!({"status": outcome.status()})))
}

/// `POST /api/conversations/{visitor_id}/{chat_id}/replied`
async fn replied(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path((visitor_id, chat_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    check_secret(&headers, &state.secret)?;
    let conversation = ConversationId::new(visitor_id, chat_id);
    let status = if state.watchdog.record_human_reply(&conversation) {
        "recorded"
    } else {
        "already_replied"
    };
    Ok(Json(json!({"status": status})))
}

/// `GET /api/conversations/{visitor_id}/{chat_id}`
async fn conversation(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path((visitor_id, chat_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    check_secret(&headers, &state.secret)?;
    let conversation = ConversationId::new(visitor_id, chat_id);
    let Some(snapshot) = state.watchdog.state(&conversation) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "unknown conversation"})),
        ));
    };
    Ok(Json(json!({
        "visitor_id": conversation.visitor_id,
        "chat_id": conversation.chat_id,
        "state": snapshot,
    })))
}

/// Build the axum router with shared state.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/chaport/webhook", post(webhook))
        .route(
            "/api/conversations/{visitor_id}/{chat_id}",
            get(conversation),
        )
        .route(
            "/api/conversations/{visitor_id}/{chat_id}/replied",
            post(replied),
        )
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(config: &ApiConfig, watchdog: Arc<Watchdog>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(ApiState::new(watchdog, config));
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        "API server listening on {addr} (webhook secret {})",
        if config.webhook_secret.is_empty() {
            "disabled"
        } else {
            "enforced"
        }
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;
    info!("API server stopped");
    Ok(())
}
