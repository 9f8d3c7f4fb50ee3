//! Table, index, and trigger definitions the message store depends on.
//!
//! `initialize` is idempotent and runs on every process start. `reset` drops
//! every row and is only wired to the administrative CLI.

use msgboard_common::{Error, Result};
use rusqlite::Connection;
use tracing::info;

/// A versioned block of DDL. The applied version is kept in `PRAGMA user_version`.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MESSAGES_SCHEMA_V1: Migration = Migration {
    version: 1,
    name: "messages",
    sql: "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            author TEXT,
            timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            git_commit_hash TEXT,
            parent_message_id INTEGER REFERENCES messages(id),
            is_deleted INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_timestamp
            ON messages(timestamp);

        CREATE TRIGGER IF NOT EXISTS update_timestamp
        AFTER UPDATE OF content ON messages
        BEGIN
            UPDATE messages SET timestamp = CURRENT_TIMESTAMP WHERE id = NEW.id;
        END;",
};

pub const MIGRATIONS: &[Migration] = &[MESSAGES_SCHEMA_V1];

/// Create the messages table, its timestamp index, and the edit trigger if
/// any of them are missing.
pub fn initialize(conn: &Connection) -> Result<()> {
    for migration in MIGRATIONS {
        conn.execute_batch(migration.sql).map_err(|e| {
            Error::Database(format!("migration {} failed: {e}", migration.name))
        })?;
        conn.pragma_update(None, "user_version", migration.version)
            .map_err(|e| Error::Database(format!("failed to record schema version: {e}")))?;
    }
    Ok(())
}

/// Drop the messages table (index and trigger go with it) and recreate it empty.
pub fn reset(conn: &Connection) -> Result<()> {
    info!("dropping messages table");
    conn.execute_batch("DROP TABLE IF EXISTS messages;")
        .map_err(|e| Error::Database(format!("failed to drop messages table: {e}")))?;
    conn.pragma_update(None, "user_version", 0)
        .map_err(|e| Error::Database(format!("failed to clear schema version: {e}")))?;
    initialize(conn)
}

pub fn schema_version(conn: &Connection) -> Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| Error::Database(format!("failed to read schema version: {e}")))
}
