//! Database schema migrations.
//!
//! Applies the initial schema: chats, messages, and the schema_migrations
//! tracking table.

use rusqlite::Connection;
use tracing::info;

use sympta_core::error::SymptaError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental
/// changes.
pub fn run_migrations(conn: &Connection) -> Result<(), SymptaError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| SymptaError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| SymptaError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), SymptaError> {
    conn.execute_batch(
        "
        -- One row per conversation. The reasoning state is a versioned JSON
        -- blob owned by sympta-core; NULL means the chat has no state yet.
        CREATE TABLE IF NOT EXISTS chats (
            id          TEXT PRIMARY KEY NOT NULL,
            title       TEXT NOT NULL DEFAULT 'Untitled',
            state       TEXT,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chats_updated_at
            ON chats (updated_at DESC);

        -- Chat transcript, append-only.
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY NOT NULL,
            chat_id     TEXT NOT NULL,
            sender      TEXT NOT NULL
                        CHECK (sender IN ('user', 'assistant')),
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages (chat_id, created_at ASC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| SymptaError::Storage(format!("Failed to apply v1 schema: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_create_tables() {
        let conn = fresh_conn();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('chats', 'messages', 'schema_migrations')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_migrations_record_version() {
        let conn = fresh_conn();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_migrations_run_twice() {
        let conn = fresh_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_sender_check_constraint() {
        let conn = fresh_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO chats (id, title, created_at, updated_at) VALUES ('c1', 'T', 0, 0)",
            [],
        )
        .unwrap();

        let bad = conn.execute(
            "INSERT INTO messages (id, chat_id, sender, content, created_at)
             VALUES ('m1', 'c1', 'robot', 'hi', 0)",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_messages_cascade_on_chat_delete() {
        let conn = fresh_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO chats (id, title, created_at, updated_at) VALUES ('c1', 'T', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO messages (id, chat_id, sender, content, created_at)
             VALUES ('m1', 'c1', 'user', 'hi', 0)",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM chats WHERE id = 'c1'", []).unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
