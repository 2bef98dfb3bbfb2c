//! Web interface of the conversational agent

pub mod rate_limit;

use agentmesh_core::agent::errors::RATE_LIMIT;
use agentmesh_core::error::{AgentError, Error};
use agentmesh_core::health::HealthReport;
use agentmesh_core::memory::{MemoryEntry, MemoryStats};
use agentmesh_core::util::generate_session_id;
use agentmesh_core::{agent::friendly_error, ChatAgent, MemoryStore, Settings};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::Html,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use rate_limit::RateLimiter;

type ApiError = (StatusCode, String);

/// Sessions' worth of requests one client address may send per minute
const PEER_SESSION_ALLOWANCE: usize = 5;

/// Shared state of the web interface
#[derive(Clone)]
pub struct AppState {
    agent: Arc<ChatAgent>,
    settings: Arc<Settings>,
    limiter: Arc<RateLimiter>,
    /// Caps clients that rotate or omit session ids
    peer_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(agent: Arc<ChatAgent>, settings: Settings) -> Self {
        let per_minute = settings.security.rate_limit_per_minute;
        let limiter = RateLimiter::per_minute(per_minute);
        let peer_limiter =
            RateLimiter::per_minute(per_minute.saturating_mul(PEER_SESSION_ALLOWANCE));
        Self {
            agent,
            settings: Arc::new(settings),
            limiter: Arc::new(limiter),
            peer_limiter: Arc::new(peer_limiter),
        }
    }

    fn memory(&self) -> Result<&Arc<MemoryStore>, ApiError> {
        self.agent.memory().ok_or((
            StatusCode::SERVICE_UNAVAILABLE,
            "Memory is disabled".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub steps: usize,
    pub tools_used: Vec<String>,
    pub duration_ms: u64,
}

/// Router for the chat page, the JSON API and `/health`
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`;
/// the chat handler limits by client address.
pub fn web_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/{id}/history", get(history_handler))
        .route("/api/sessions/{id}", delete(clear_session_handler))
        .route("/api/memory/stats", get(memory_stats_handler))
        .with_state(state)
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("static/index.html"))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    let memory = state.agent.memory().map(|store| store.as_ref());
    Json(HealthReport::collect(&state.settings, memory).await)
}

async fn chat_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(generate_session_id);

    if !state.limiter.check(&session_id) {
        warn!("Rate limit exceeded for session {}", session_id);
        return Err((StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT.to_string()));
    }
    if !state.peer_limiter.check(&peer.ip().to_string()) {
        warn!("Rate limit exceeded for client {}", peer.ip());
        return Err((StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT.to_string()));
    }

    match state.agent.reply(&session_id, &req.message).await {
        Ok(reply) => {
            info!(
                "Session {}: replied in {} ms after {} step(s)",
                session_id, reply.duration_ms, reply.steps
            );
            Ok(Json(ChatResponse {
                session_id,
                response: reply.text,
                steps: reply.steps,
                tools_used: reply.tools_used,
                duration_ms: reply.duration_ms,
            }))
        }
        Err(e) => {
            error!("Chat request failed for session {}: {}", session_id, e);
            let status = match &e {
                Error::Agent(AgentError::InvalidInput { .. })
                | Error::Agent(AgentError::InputTooLong { .. }) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, friendly_error(&e)))
        }
    }
}

async fn history_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<MemoryEntry>>, ApiError> {
    let memory = state.memory()?;
    Ok(Json(memory.session_history(&session_id, None).await))
}

async fn clear_session_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let memory = state.memory()?;
    let cleared = memory.clear_session(&session_id).await;
    info!("Cleared {} memories of session {}", cleared, session_id);
    Ok(Json(json!({ "session_id": session_id, "cleared": cleared })))
}

async fn memory_stats_handler(State(state): State<AppState>) -> Result<Json<MemoryStats>, ApiError> {
    let memory = state.memory()?;
    Ok(Json(memory.stats().await))
}
