//! SQLite-backed persistence for chats, messages, and conversation state.
//!
//! The chat store: it loads per-chat state and transcripts, hands them to
//! the caller, and writes back whatever the caller decided to persist. The
//! turn orchestrator itself never touches this crate.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ChatRepository, MessageRepository};
