use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row id assigned by the store on insert.
pub type MessageId = i64;

/// Text layout SQLite's `CURRENT_TIMESTAMP` produces, also used on the wire.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted board message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub author: Option<String>,
    /// Creation time, rewritten whenever the content is edited.
    pub timestamp: DateTime<Utc>,
    pub git_commit_hash: Option<String>,
    /// Reply-to reference. May point at a row that no longer exists.
    pub parent_message_id: Option<MessageId>,
    pub is_deleted: bool,
}

/// Insert shape before the store assigns id and timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
    pub author: Option<String>,
    pub parent_message_id: Option<MessageId>,
}

impl NewMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn by(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn reply_to(mut self, parent: MessageId) -> Self {
        self.parent_message_id = Some(parent);
        self
    }
}

/// Minimal projection served by `GET /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: MessageId,
    pub content: String,
    pub timestamp: String,
}

impl From<&Message> for MessageSummary {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            timestamp: message.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}
