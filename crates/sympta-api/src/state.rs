//! Application state shared across all route handlers.
//!
//! AppState holds references to the repositories, the turn orchestrator,
//! and the per-chat turn locks. It is passed to handlers via axum's State
//! extractor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use sympta_chat::TurnOrchestrator;
use sympta_core::config::SymptaConfig;
use sympta_storage::{ChatRepository, Database, MessageRepository};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<SymptaConfig>,
    /// SQLite database for persistent storage.
    pub database: Arc<Database>,
    /// Chat records and conversation state.
    pub chats: Arc<ChatRepository>,
    /// Append-only chat transcripts.
    pub messages: Arc<MessageRepository>,
    /// The per-turn reasoning orchestrator.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// One async lock per chat id: turns on the same chat are serialized
    /// because the evidence merge is not safe under concurrent writers.
    turn_locks: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with the given components.
    pub fn new(config: SymptaConfig, database: Database, orchestrator: TurnOrchestrator) -> Self {
        let database = Arc::new(database);
        Self {
            config: Arc::new(config),
            chats: Arc::new(ChatRepository::new(Arc::clone(&database))),
            messages: Arc::new(MessageRepository::new(Arc::clone(&database))),
            database,
            orchestrator: Arc::new(orchestrator),
            turn_locks: Arc::new(Mutex::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    /// The turn lock for a chat, created on first use.
    pub fn turn_lock(&self, chat_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .turn_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(chat_id).or_default())
    }
}
