//! HTTP API gateway for Threadloom.
//!
//! Endpoints:
//!
//! - `GET  /health`                                          — liveness check
//! - `GET  /v1/sessions`                                     — list session ids
//! - `GET  /v1/sessions/{sid}/characters`                    — roster
//! - `GET  /v1/sessions/{sid}/characters/{cid}`              — one character
//! - `GET  /v1/sessions/{sid}/messages`                      — all messages
//! - `GET  /v1/sessions/{sid}/messages/{mid}`                — one message
//! - `GET  /v1/sessions/{sid}/messages/{mid}/characters`     — attendance at a message
//! - `POST /v1/sessions/{sid}/messages/user`                 — post a human message / command
//! - `POST /v1/sessions/{sid}/messages/agent`                — generate an agent turn
//! - `POST /v1/sessions/{sid}/reload`                        — hot-reload one session
//!
//! Built on Axum. Each session sits behind one coarse lock: an agent turn
//! holds the write guard across the completion call, so no other work is
//! interleaved into that conversation while the provider is thinking. A
//! client that disconnects mid-turn drops the handler future, cancelling
//! the pending provider call before anything is committed.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use threadloom_core::{Character, Error, Message, MessageId};
use threadloom_engine::SessionRegistry;

/// Shared state for the gateway: the immutable session registry. Mutability
/// lives inside each session's own lock.
pub type SharedRegistry = Arc<SessionRegistry>;

/// Build the Axum router with all gateway routes.
pub fn build_router(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/sessions", get(list_sessions_handler))
        .route("/v1/sessions/{sid}/characters", get(list_characters_handler))
        .route(
            "/v1/sessions/{sid}/characters/{cid}",
            get(get_character_handler),
        )
        .route("/v1/sessions/{sid}/messages", get(list_messages_handler))
        .route("/v1/sessions/{sid}/messages/{mid}", get(get_message_handler))
        .route(
            "/v1/sessions/{sid}/messages/{mid}/characters",
            get(characters_at_handler),
        )
        .route(
            "/v1/sessions/{sid}/messages/user",
            post(post_user_message_handler),
        )
        .route(
            "/v1/sessions/{sid}/messages/agent",
            post(post_agent_message_handler),
        )
        .route("/v1/sessions/{sid}/reload", post(reload_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(registry)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: &str, registry: SharedRegistry) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, sessions = registry.len(), "Gateway listening");
    axum::serve(listener, build_router(registry)).await
}

// ── Error mapping ─────────────────────────────────────────────────────────

/// Wraps the domain error for HTTP surfacing: `{ "detail": "..." }` with a
/// status derived from the error kind.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::Provider(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "detail": self.0.to_string() }));
        (status, body).into_response()
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────

/// Public character view. Knowledge prompts stay server-side.
#[derive(Serialize)]
struct CharacterDto {
    character_id: String,
    name: String,
    color: String,
}

impl From<&Character> for CharacterDto {
    fn from(character: &Character) -> Self {
        Self {
            character_id: character.id.clone(),
            name: character.display_name.clone(),
            color: character.color.clone(),
        }
    }
}

#[derive(Serialize)]
struct CharacterListResponse {
    entries: Vec<CharacterDto>,
}

#[derive(Serialize)]
struct MessageListResponse {
    entries: Vec<Message>,
}

#[derive(Serialize)]
struct SessionListResponse {
    entries: Vec<String>,
}

#[derive(Deserialize)]
struct UserMessageRequest {
    #[serde(default)]
    parent_message_id: Option<String>,
    author_id: String,
    content: String,
}

#[derive(Deserialize)]
struct AgentMessageRequest {
    #[serde(default)]
    parent_message_id: Option<String>,
    #[serde(default)]
    character_id: Option<String>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_sessions_handler(
    State(registry): State<SharedRegistry>,
) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        entries: registry.session_ids(),
    })
}

async fn list_characters_handler(
    State(registry): State<SharedRegistry>,
    Path(sid): Path<String>,
) -> Result<Json<CharacterListResponse>, ApiError> {
    let session = registry.get(&sid)?;
    let guard = session.read().await;
    Ok(Json(CharacterListResponse {
        entries: guard.list_characters().iter().map(CharacterDto::from).collect(),
    }))
}

async fn get_character_handler(
    State(registry): State<SharedRegistry>,
    Path((sid, cid)): Path<(String, String)>,
) -> Result<Json<CharacterDto>, ApiError> {
    let session = registry.get(&sid)?;
    let guard = session.read().await;
    Ok(Json(CharacterDto::from(guard.get_character(&cid)?)))
}

async fn list_messages_handler(
    State(registry): State<SharedRegistry>,
    Path(sid): Path<String>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let session = registry.get(&sid)?;
    let guard = session.read().await;
    Ok(Json(MessageListResponse {
        entries: guard.list_messages().to_vec(),
    }))
}

async fn get_message_handler(
    State(registry): State<SharedRegistry>,
    Path((sid, mid)): Path<(String, String)>,
) -> Result<Json<Message>, ApiError> {
    let session = registry.get(&sid)?;
    let guard = session.read().await;
    Ok(Json(guard.get_message(&MessageId(mid))?.clone()))
}

async fn characters_at_handler(
    State(registry): State<SharedRegistry>,
    Path((sid, mid)): Path<(String, String)>,
) -> Result<Json<CharacterListResponse>, ApiError> {
    let session = registry.get(&sid)?;
    let guard = session.read().await;
    let mut entries = Vec::new();
    for id in guard.active_characters_at(&MessageId(mid))? {
        // Attendance can name an id no longer in the roster; skip those
        if let Ok(character) = guard.get_character(&id) {
            entries.push(CharacterDto::from(character));
        }
    }
    Ok(Json(CharacterListResponse { entries }))
}

async fn post_user_message_handler(
    State(registry): State<SharedRegistry>,
    Path(sid): Path<String>,
    Json(request): Json<UserMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let session = registry.get(&sid)?;
    let mut guard = session.write().await;
    let parent_id = request.parent_message_id.map(MessageId);
    let message =
        guard.post_user_message(parent_id.as_ref(), &request.author_id, &request.content)?;
    Ok(Json(message))
}

async fn post_agent_message_handler(
    State(registry): State<SharedRegistry>,
    Path(sid): Path<String>,
    Json(request): Json<AgentMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let session = registry.get(&sid)?;
    let mut guard = session.write().await;
    let parent_id = request.parent_message_id.map(MessageId);
    let message = guard
        .post_agent_message(parent_id.as_ref(), request.character_id.as_deref())
        .await?;
    Ok(Json(message))
}

async fn reload_handler(
    State(registry): State<SharedRegistry>,
    Path(sid): Path<String>,
) -> Result<StatusCode, ApiError> {
    registry.reload(&sid).await?;
    Ok(StatusCode::NO_CONTENT)
}
