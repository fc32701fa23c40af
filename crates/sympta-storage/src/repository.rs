//! Repository implementations for SQLite-backed persistence.
//!
//! `ChatRepository` owns the chats table including the versioned
//! conversation-state blob; `MessageRepository` owns the append-only
//! transcript. Both operate on the shared `Database` using raw SQL.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::warn;
use uuid::Uuid;

use sympta_core::error::SymptaError;
use sympta_core::types::{ChatRecord, ConversationState, MessageRecord, Sender};

use crate::db::Database;

/// Repository for chat records and their conversation state.
pub struct ChatRepository {
    db: Arc<Database>,
}

impl ChatRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new chat with no conversation state.
    pub fn create(&self, title: &str) -> Result<ChatRecord, SymptaError> {
        let now_secs = Utc::now().timestamp();
        let record = ChatRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: to_datetime(now_secs)?,
            updated_at: to_datetime(now_secs)?,
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (id, title, state, created_at, updated_at)
                 VALUES (?1, ?2, NULL, ?3, ?4)",
                rusqlite::params![record.id.to_string(), record.title, now_secs, now_secs],
            )
            .map_err(|e| SymptaError::Storage(format!("Failed to create chat: {}", e)))?;
            Ok(())
        })?;

        Ok(record)
    }

    /// Find a chat by ID.
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<ChatRecord>, SymptaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title, created_at, updated_at FROM chats WHERE id = ?1")
                .map_err(|e| SymptaError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![id.to_string()], |row| Ok(row_to_chat(row)))
                .optional()
                .map_err(|e| SymptaError::Storage(e.to_string()))?;

            match result {
                Some(record) => Ok(Some(record?)),
                None => Ok(None),
            }
        })
    }

    /// List all chats, most recently updated first.
    pub fn list(&self) -> Result<Vec<ChatRecord>, SymptaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, created_at, updated_at FROM chats
                     ORDER BY updated_at DESC, rowid DESC",
                )
                .map_err(|e| SymptaError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_chat(row)))
                .map_err(|e| SymptaError::Storage(e.to_string()))?;

            let mut chats = Vec::new();
            for row in rows {
                let chat = row.map_err(|e| SymptaError::Storage(e.to_string()))??;
                chats.push(chat);
            }
            Ok(chats)
        })
    }

    /// Rename a chat. Returns false if the chat does not exist.
    pub fn rename(&self, id: Uuid, title: &str) -> Result<bool, SymptaError> {
        let now_secs = Utc::now().timestamp();
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chats SET title = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![title, now_secs, id.to_string()],
                )
                .map_err(|e| SymptaError::Storage(format!("Failed to rename chat: {}", e)))?;
            Ok(changed > 0)
        })
    }

    /// Load the conversation state for a chat.
    ///
    /// Returns `None` when the chat has no state yet, and also when the
    /// stored blob fails to parse or validate; a corrupt blob is logged
    /// and treated as a fresh conversation rather than poisoning the chat.
    pub fn load_state(&self, id: Uuid) -> Result<Option<ConversationState>, SymptaError> {
        let blob: Option<Option<String>> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT state FROM chats WHERE id = ?1",
                rusqlite::params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| SymptaError::Storage(e.to_string()))
        })?;

        let Some(Some(json)) = blob else {
            return Ok(None);
        };
        if json.is_empty() {
            return Ok(None);
        }

        match ConversationState::from_json(&json) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(chat_id = %id, error = %e, "Discarding invalid conversation state");
                Ok(None)
            }
        }
    }

    /// Persist the conversation state for a chat.
    pub fn save_state(&self, id: Uuid, state: &ConversationState) -> Result<(), SymptaError> {
        let json = state.to_json()?;
        let now_secs = Utc::now().timestamp();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE chats SET state = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![json, now_secs, id.to_string()],
            )
            .map_err(|e| SymptaError::Storage(format!("Failed to save state: {}", e)))?;
            Ok(())
        })
    }

    /// Bump a chat's updated_at timestamp.
    pub fn touch(&self, id: Uuid) -> Result<(), SymptaError> {
        let now_secs = Utc::now().timestamp();
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE chats SET updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now_secs, id.to_string()],
            )
            .map_err(|e| SymptaError::Storage(format!("Failed to touch chat: {}", e)))?;
            Ok(())
        })
    }

    /// Count stored chats.
    pub fn count(&self) -> Result<u64, SymptaError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))
                .map_err(|e| SymptaError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

/// Repository for the append-only chat transcript.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a message to a chat's transcript.
    pub fn append(
        &self,
        chat_id: Uuid,
        sender: Sender,
        content: &str,
    ) -> Result<MessageRecord, SymptaError> {
        let now_secs = Utc::now().timestamp();
        let record = MessageRecord {
            id: Uuid::new_v4(),
            chat_id,
            sender,
            content: content.to_string(),
            created_at: to_datetime(now_secs)?,
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, chat_id, sender, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.id.to_string(),
                    chat_id.to_string(),
                    sender.as_str(),
                    record.content,
                    now_secs,
                ],
            )
            .map_err(|e| SymptaError::Storage(format!("Failed to append message: {}", e)))?;
            Ok(())
        })?;

        Ok(record)
    }

    /// All messages of a chat in send order.
    pub fn list_for_chat(&self, chat_id: Uuid) -> Result<Vec<MessageRecord>, SymptaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, chat_id, sender, content, created_at FROM messages
                     WHERE chat_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(|e| SymptaError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![chat_id.to_string()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| SymptaError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| SymptaError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }

    /// Count messages in a chat.
    pub fn count_for_chat(&self, chat_id: Uuid) -> Result<u64, SymptaError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
                    rusqlite::params![chat_id.to_string()],
                    |row| row.get(0),
                )
                .map_err(|e| SymptaError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

// -- Row mapping --

fn row_to_chat(row: &rusqlite::Row<'_>) -> Result<ChatRecord, SymptaError> {
    let id: String = row.get(0).map_err(|e| SymptaError::Storage(e.to_string()))?;
    let title: String = row.get(1).map_err(|e| SymptaError::Storage(e.to_string()))?;
    let created: i64 = row.get(2).map_err(|e| SymptaError::Storage(e.to_string()))?;
    let updated: i64 = row.get(3).map_err(|e| SymptaError::Storage(e.to_string()))?;

    Ok(ChatRecord {
        id: parse_uuid(&id)?,
        title,
        created_at: to_datetime(created)?,
        updated_at: to_datetime(updated)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRecord, SymptaError> {
    let id: String = row.get(0).map_err(|e| SymptaError::Storage(e.to_string()))?;
    let chat_id: String = row.get(1).map_err(|e| SymptaError::Storage(e.to_string()))?;
    let sender: String = row.get(2).map_err(|e| SymptaError::Storage(e.to_string()))?;
    let content: String = row.get(3).map_err(|e| SymptaError::Storage(e.to_string()))?;
    let created: i64 = row.get(4).map_err(|e| SymptaError::Storage(e.to_string()))?;

    Ok(MessageRecord {
        id: parse_uuid(&id)?,
        chat_id: parse_uuid(&chat_id)?,
        sender: Sender::try_from(sender.as_str())?,
        content,
        created_at: to_datetime(created)?,
    })
}

fn parse_uuid(s: &str) -> Result<Uuid, SymptaError> {
    Uuid::parse_str(s).map_err(|e| SymptaError::Storage(format!("invalid uuid {}: {}", s, e)))
}

fn to_datetime(epoch_secs: i64) -> Result<DateTime<Utc>, SymptaError> {
    Utc.timestamp_opt(epoch_secs, 0)
        .single()
        .ok_or_else(|| SymptaError::Storage(format!("invalid timestamp {}", epoch_secs)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sympta_core::types::{Choice, EvidenceItem, Sex};

    fn repos() -> (ChatRepository, MessageRepository) {
        let db = Arc::new(Database::in_memory().unwrap());
        (
            ChatRepository::new(Arc::clone(&db)),
            MessageRepository::new(db),
        )
    }

    // ---- Chats ----

    #[test]
    fn test_create_and_find_chat() {
        let (chats, _) = repos();
        let created = chats.create("First consultation").unwrap();
        let found = chats.find_by_id(created.id).unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_find_missing_chat() {
        let (chats, _) = repos();
        assert!(chats.find_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_orders_most_recent_first() {
        let (chats, _) = repos();
        let a = chats.create("a").unwrap();
        let b = chats.create("b").unwrap();
        // Same-second creation: rowid breaks the tie, newest first.
        let listed = chats.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
    }

    #[test]
    fn test_rename_chat() {
        let (chats, _) = repos();
        let chat = chats.create("Untitled").unwrap();
        assert!(chats.rename(chat.id, "Fever follow-up").unwrap());
        let found = chats.find_by_id(chat.id).unwrap().unwrap();
        assert_eq!(found.title, "Fever follow-up");
    }

    #[test]
    fn test_rename_missing_chat() {
        let (chats, _) = repos();
        assert!(!chats.rename(Uuid::new_v4(), "nope").unwrap());
    }

    #[test]
    fn test_count_chats() {
        let (chats, _) = repos();
        assert_eq!(chats.count().unwrap(), 0);
        chats.create("a").unwrap();
        chats.create("b").unwrap();
        assert_eq!(chats.count().unwrap(), 2);
    }

    // ---- Conversation state ----

    #[test]
    fn test_fresh_chat_has_no_state() {
        let (chats, _) = repos();
        let chat = chats.create("new").unwrap();
        assert!(chats.load_state(chat.id).unwrap().is_none());
    }

    #[test]
    fn test_state_round_trip() {
        let (chats, _) = repos();
        let chat = chats.create("state").unwrap();

        let mut state = ConversationState::default();
        state.sex = Sex::Female;
        state.age = 44;
        state
            .evidence
            .push(EvidenceItem::reported("s_98", Choice::Present));

        chats.save_state(chat.id, &state).unwrap();
        let loaded = chats.load_state(chat.id).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_corrupt_state_is_discarded() {
        let (chats, _) = repos();
        let chat = chats.create("corrupt").unwrap();

        chats
            .db
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE chats SET state = 'not json' WHERE id = ?1",
                    rusqlite::params![chat.id.to_string()],
                )
                .map_err(|e| SymptaError::Storage(e.to_string()))?;
                Ok(())
            })
            .unwrap();

        assert!(chats.load_state(chat.id).unwrap().is_none());
    }

    #[test]
    fn test_unknown_state_version_is_discarded() {
        let (chats, _) = repos();
        let chat = chats.create("future").unwrap();

        chats
            .db
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE chats SET state = '{\"version\":9,\"evidence\":[]}' WHERE id = ?1",
                    rusqlite::params![chat.id.to_string()],
                )
                .map_err(|e| SymptaError::Storage(e.to_string()))?;
                Ok(())
            })
            .unwrap();

        assert!(chats.load_state(chat.id).unwrap().is_none());
    }

    // ---- Messages ----

    #[test]
    fn test_append_and_list_messages() {
        let (chats, messages) = repos();
        let chat = chats.create("talk").unwrap();

        messages.append(chat.id, Sender::User, "I have a headache").unwrap();
        messages
            .append(chat.id, Sender::Assistant, "How long has it lasted?")
            .unwrap();

        let listed = messages.list_for_chat(chat.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].sender, Sender::User);
        assert_eq!(listed[0].content, "I have a headache");
        assert_eq!(listed[1].sender, Sender::Assistant);
    }

    #[test]
    fn test_messages_are_scoped_to_chat() {
        let (chats, messages) = repos();
        let a = chats.create("a").unwrap();
        let b = chats.create("b").unwrap();

        messages.append(a.id, Sender::User, "for a").unwrap();
        messages.append(b.id, Sender::User, "for b").unwrap();

        let listed = messages.list_for_chat(a.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "for a");
        assert_eq!(messages.count_for_chat(b.id).unwrap(), 1);
    }

    #[test]
    fn test_append_to_missing_chat_fails() {
        let (_, messages) = repos();
        let result = messages.append(Uuid::new_v4(), Sender::User, "orphan");
        assert!(result.is_err());
    }

    #[test]
    fn test_message_order_preserved() {
        let (chats, messages) = repos();
        let chat = chats.create("ordered").unwrap();
        for i in 0..5 {
            messages
                .append(chat.id, Sender::User, &format!("msg {}", i))
                .unwrap();
        }
        let listed = messages.list_for_chat(chat.id).unwrap();
        let contents: Vec<&str> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }
}
