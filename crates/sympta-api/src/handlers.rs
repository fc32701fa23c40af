//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/body parameters via axum extractors,
//! interacts with AppState services, and returns JSON responses.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use sympta_core::types::{ChatRecord, MessageRecord, Sender};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub total_chats: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatDetailResponse {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageView {
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for MessageView {
    fn from(record: MessageRecord) -> Self {
        Self {
            sender: record.sender,
            content: record.content,
            created_at: record.created_at,
        }
    }
}

/// The answer to one user turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub chat_id: Uuid,
    pub reply: String,
    /// True when the reply came from the diagnosis pipeline rather than
    /// the free-text engine.
    pub diagnostic: bool,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - liveness plus a few cheap stats.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let total_chats = state.chats.count()?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        total_chats,
    }))
}

/// POST /chats - start a new chat.
pub async fn create_chat(
    State(state): State<AppState>,
    Json(req): Json<CreateChatRequest>,
) -> Result<Json<ChatRecord>, ApiError> {
    let title = req.title.as_deref().unwrap_or("Untitled");
    let chat = state.chats.create(title)?;
    info!(chat_id = %chat.id, "Chat created");
    Ok(Json(chat))
}

/// GET /chats - all chats, most recently updated first.
pub async fn list_chats(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChatRecord>>, ApiError> {
    Ok(Json(state.chats.list()?))
}

/// GET /chats/{id} - one chat with its transcript.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatDetailResponse>, ApiError> {
    let chat = state
        .chats
        .find_by_id(id)?
        .ok_or_else(|| ApiError::NotFound(format!("No chat with id {}", id)))?;

    let messages = state
        .messages
        .list_for_chat(id)?
        .into_iter()
        .map(MessageView::from)
        .collect();

    Ok(Json(ChatDetailResponse {
        id: chat.id,
        title: chat.title,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
        messages,
    }))
}

/// PATCH /chats/{id} - rename a chat.
pub async fn rename_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameChatRequest>,
) -> Result<Json<ChatRecord>, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title must not be empty".to_string()));
    }
    if !state.chats.rename(id, req.title.trim())? {
        return Err(ApiError::NotFound(format!("No chat with id {}", id)));
    }
    let chat = state
        .chats
        .find_by_id(id)?
        .ok_or_else(|| ApiError::NotFound(format!("No chat with id {}", id)))?;
    Ok(Json(chat))
}

/// POST /chats/{id}/message - run one user turn.
///
/// Turns on the same chat are serialized behind a per-chat lock; the
/// evidence merge inside a turn is not safe under concurrent writers.
/// Persistence happens strictly after the orchestrator returns, so a
/// request aborted mid-turn leaves no partial state behind.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest(
            "Message content must not be empty".to_string(),
        ));
    }
    if content.chars().count() > state.config.engine.max_message_chars {
        return Err(ApiError::BadRequest(format!(
            "Message exceeds maximum length of {} characters",
            state.config.engine.max_message_chars
        )));
    }

    let chat = state
        .chats
        .find_by_id(id)?
        .ok_or_else(|| ApiError::NotFound(format!("No chat with id {}", id)))?;

    let lock = state.turn_lock(chat.id);
    let _turn = lock.lock().await;

    state.messages.append(chat.id, Sender::User, content)?;

    let prior = state.chats.load_state(chat.id)?;
    let result = state.orchestrator.run_turn(prior, content).await;

    state
        .messages
        .append(chat.id, Sender::Assistant, &result.text)?;
    if let Some(ref updated) = result.updated_state {
        state.chats.save_state(chat.id, updated)?;
    } else {
        state.chats.touch(chat.id)?;
    }

    info!(
        chat_id = %chat.id,
        diagnostic = result.is_diagnostic_answer,
        "Turn completed"
    );

    Ok(Json(TurnResponse {
        chat_id: chat.id,
        reply: result.text,
        diagnostic: result.is_diagnostic_answer,
    }))
}
