use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use msgboard_common::{Error, Message, MessageId, NewMessage, Result};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::schema;

pub const DEFAULT_LIST_LIMIT: usize = 100;
const MAX_LIST_LIMIT: usize = 1000;

const MESSAGE_COLUMNS: &str =
    "id, content, author, timestamp, git_commit_hash, parent_message_id, is_deleted";

/// Fixed-size page over the newest-first listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: usize,
    pub offset: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

/// The operations the HTTP gateway needs from message storage.
#[async_trait]
pub trait MessageProvider: Send + Sync {
    async fn list(&self, query: ListQuery) -> Result<Vec<Message>>;
    async fn get(&self, id: MessageId) -> Result<Option<Message>>;
    async fn insert(&self, message: NewMessage) -> Result<MessageId>;
    async fn update_content(&self, id: MessageId, content: &str) -> Result<bool>;
    async fn soft_delete(&self, id: MessageId) -> Result<bool>;
    async fn annotate_commit_hash(&self, id: MessageId, hash: &str) -> Result<bool>;
}

/// SQLite-backed message storage.
///
/// Holds no open handle. Each call opens its own connection on the blocking
/// pool and closes it when the call returns, whichever way it returns.
#[derive(Debug, Clone)]
pub struct MessageStore {
    db_path: Arc<PathBuf>,
}

impl MessageStore {
    /// Open the store at `db_path`, creating the parent directory and the
    /// schema when missing. Runs on the blocking pool like every other call.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let db_path = db_path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::open_blocking(db_path))
            .await
            .map_err(|e| Error::Database(format!("storage worker failed: {e}")))?
    }

    fn open_blocking(db_path: PathBuf) -> Result<Self> {
        info!("opening message store at {}", db_path.display());
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Database(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let store = Self {
            db_path: Arc::new(db_path),
        };
        let conn = store.connect()?;
        schema::initialize(&conn)?;
        Ok(store)
    }

    /// Open a fresh connection to the backing file. Dropping it closes it.
    pub fn connect(&self) -> Result<Connection> {
        Connection::open(self.db_path.as_path())
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))
    }

    /// Drop every message and recreate the schema.
    pub async fn reset(&self) -> Result<()> {
        info!("resetting message store at {}", self.db_path.display());
        self.run_blocking(schema::reset).await
    }

    /// Schema version recorded in the database file.
    pub async fn schema_version(&self) -> Result<u32> {
        self.run_blocking(schema::schema_version).await
    }

    pub async fn list(&self, query: ListQuery) -> Result<Vec<Message>> {
        self.run_blocking(move |conn| list_sync(conn, query, false)).await
    }

    /// Administrative listing that also returns soft-deleted rows.
    pub async fn list_all(&self, query: ListQuery) -> Result<Vec<Message>> {
        self.run_blocking(move |conn| list_sync(conn, query, true)).await
    }

    pub async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        self.run_blocking(move |conn| get_sync(conn, id, false)).await
    }

    /// Raw row fetch, deleted or not.
    pub async fn fetch_raw(&self, id: MessageId) -> Result<Option<Message>> {
        self.run_blocking(move |conn| get_sync(conn, id, true)).await
    }

    pub async fn insert(&self, message: NewMessage) -> Result<MessageId> {
        require_text("content", &message.content)?;
        self.run_blocking(move |conn| insert_sync(conn, &message)).await
    }

    /// Rewrite the content of a live message. Returns false when the id is
    /// unknown or soft-deleted.
    pub async fn update_content(&self, id: MessageId, content: &str) -> Result<bool> {
        require_text("content", content)?;
        let content = content.to_string();
        self.run_blocking(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE messages SET content = ?1 WHERE id = ?2 AND is_deleted = 0",
                    params![content, id],
                )
                .map_err(|e| Error::Database(format!("failed to update message: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    /// Flag a message as deleted. Returns false only when the id is unknown.
    pub async fn soft_delete(&self, id: MessageId) -> Result<bool> {
        self.run_blocking(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE messages SET is_deleted = 1 WHERE id = ?1",
                    params![id],
                )
                .map_err(|e| Error::Database(format!("failed to delete message: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    /// Attach a git commit hash. Deleted messages can still be annotated.
    pub async fn annotate_commit_hash(&self, id: MessageId, hash: &str) -> Result<bool> {
        require_text("git_commit_hash", hash)?;
        let hash = hash.trim().to_string();
        self.run_blocking(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE messages SET git_commit_hash = ?1 WHERE id = ?2",
                    params![hash, id],
                )
                .map_err(|e| Error::Database(format!("failed to annotate message: {e}")))?;
            Ok(changed > 0)
        })
        .await
    }

    /// Live direct replies to `id`, oldest first.
    pub async fn replies(&self, id: MessageId) -> Result<Vec<Message>> {
        self.run_blocking(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE parent_message_id = ?1 AND is_deleted = 0
                     ORDER BY timestamp ASC, id ASC"
                ))
                .map_err(|e| Error::Database(format!("failed to prepare replies query: {e}")))?;
            let rows = stmt
                .query_map(params![id], row_to_message)
                .map_err(|e| Error::Database(format!("failed to query replies: {e}")))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::Database(format!("failed to collect replies: {e}")))
        })
        .await
    }

    /// The live message `id` replies to. Dangling and deleted parents read as
    /// no parent.
    pub async fn parent_of(&self, id: MessageId) -> Result<Option<Message>> {
        self.run_blocking(move |conn| {
            let Some(child) = get_sync(conn, id, false)? else {
                return Ok(None);
            };
            match child.parent_message_id {
                Some(parent_id) => get_sync(conn, parent_id, false),
                None => Ok(None),
            }
        })
        .await
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.connect()?;
            op(&conn)
        })
        .await
        .map_err(|e| Error::Database(format!("storage worker failed: {e}")))?
    }
}

#[async_trait]
impl MessageProvider for MessageStore {
    async fn list(&self, query: ListQuery) -> Result<Vec<Message>> {
        self.list(query).await
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        self.get(id).await
    }

    async fn insert(&self, message: NewMessage) -> Result<MessageId> {
        self.insert(message).await
    }

    async fn update_content(&self, id: MessageId, content: &str) -> Result<bool> {
        self.update_content(id, content).await
    }

    async fn soft_delete(&self, id: MessageId) -> Result<bool> {
        self.soft_delete(id).await
    }

    async fn annotate_commit_hash(&self, id: MessageId, hash: &str) -> Result<bool> {
        self.annotate_commit_hash(id, hash).await
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::missing_field(field));
    }
    Ok(())
}

fn list_sync(conn: &Connection, query: ListQuery, include_deleted: bool) -> Result<Vec<Message>> {
    let limit = clamp_limit(query.limit) as i64;
    let offset = query.offset as i64;
    let filter = if include_deleted {
        ""
    } else {
        "WHERE is_deleted = 0"
    };

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages {filter}
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1 OFFSET ?2"
        ))
        .map_err(|e| Error::Database(format!("failed to prepare list query: {e}")))?;

    let rows = stmt
        .query_map(params![limit, offset], row_to_message)
        .map_err(|e| Error::Database(format!("failed to execute list query: {e}")))?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Database(format!("failed to collect message rows: {e}")))
}

fn get_sync(conn: &Connection, id: MessageId, include_deleted: bool) -> Result<Option<Message>> {
    let filter = if include_deleted {
        ""
    } else {
        "AND is_deleted = 0"
    };
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1 {filter}"),
        params![id],
        row_to_message,
    )
    .optional()
    .map_err(|e| Error::Database(format!("failed to fetch message {id}: {e}")))
}

fn insert_sync(conn: &Connection, message: &NewMessage) -> Result<MessageId> {
    conn.execute(
        "INSERT INTO messages (content, author, parent_message_id) VALUES (?1, ?2, ?3)",
        params![message.content, message.author, message.parent_message_id],
    )
    .map_err(|e| Error::Database(format!("failed to insert message: {e}")))?;
    Ok(conn.last_insert_rowid())
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let timestamp_str: String = row.get(3)?;
    let timestamp = parse_timestamp(&timestamp_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::other(e.to_string())),
        )
    })?;

    Ok(Message {
        id: row.get(0)?,
        content: row.get(1)?,
        author: row.get(2)?,
        timestamp,
        git_commit_hash: row.get(4)?,
        parent_message_id: row.get(5)?,
        is_deleted: row.get(6)?,
    })
}

fn clamp_limit(limit: usize) -> usize {
    if limit == 0 {
        DEFAULT_LIST_LIMIT
    } else {
        limit.min(MAX_LIST_LIMIT)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, msgboard_common::TIMESTAMP_FORMAT) {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    Err(Error::Database(format!("invalid timestamp format: {raw}")))
}
