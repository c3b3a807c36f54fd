//! Chat relay HTTP API.
//!
//! Routes, all but the first two mounted under the configured prefix:
//! - GET /
//! - GET /ping
//! - POST {prefix}/chat
//! - POST {prefix}/chat/stream
//! - GET {prefix}/health
//! - GET {prefix}/models

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderValue;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::relay::{ChatRequest, HealthAggregator, HealthStatus, ModelList, RelayEngine};
use crate::server::error::ApiError;
use crate::server::streaming::relay_to_sse_stream;

/// Application state shared across handlers.
pub struct AppState {
    pub relay: RelayEngine,
    pub health: HealthAggregator,
    pub config: Arc<Config>,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .route("/health", get(health))
        .route("/models", get(list_models));

    let router = Router::new()
        .route("/", get(root))
        .route("/ping", get(ping));

    // axum refuses to nest at the root.
    let prefix = state.config.server.api_prefix.trim_end_matches('/');
    let router = if prefix.is_empty() {
        router.merge(api)
    } else {
        router.nest(prefix, api)
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.server.allowed_origins)),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = origin.as_str(), "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

// ─── Response Types ────────────────────────────────────────────────────────

/// Unary chat response.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": format!("Welcome to {}", state.config.server.app_name),
        "version": state.config.server.version,
    }))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong" }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id = request_id.as_str(),
        model = ?req.model,
        chars = req.message.len(),
        "Chat request"
    );

    let result = state.relay.generate(&req).await?;

    if !result.success {
        let cause = result.error.unwrap_or_else(|| "Unknown error".to_string());
        return Err(ApiError::Generation(cause));
    }

    info!(
        request_id = request_id.as_str(),
        model = result.model.as_str(),
        chars = result.response_text.len(),
        "Chat complete"
    );

    Ok(Json(ChatResponse {
        response: result.response_text,
        model: result.model,
        timestamp: result.timestamp,
    }))
}

async fn chat_stream(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id = request_id.as_str(),
        model = ?req.model,
        chars = req.message.len(),
        "Streaming chat request"
    );

    let events = state.relay.stream(&req)?;
    let stream = relay_to_sse_stream(events, request_id);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(state.health.check_health().await)
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(state.health.list_models().await)
}
