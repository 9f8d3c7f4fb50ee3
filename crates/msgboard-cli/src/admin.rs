//! One-shot database management commands.

use std::path::Path;

use anyhow::{Context, Result, bail};
use msgboard_common::{Message, MessageId, TIMESTAMP_FORMAT};
use msgboard_db::{ListQuery, MessageStore, seed};
use tracing::info;

/// What `msgboard db` should do after the schema is ensured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbAction {
    Initialize,
    Reset,
    SeedSampleData,
}

pub async fn run_db_command(db_path: &Path, action: DbAction) -> Result<String> {
    let store = MessageStore::open(db_path)
        .await
        .with_context(|| format!("error initializing database at {}", db_path.display()))?;

    let report = match action {
        DbAction::Initialize => {
            let version = store.schema_version().await?;
            format!(
                "Database initialized successfully at {} (schema version {version})",
                db_path.display()
            )
        }
        DbAction::Reset => {
            store.reset().await.context("error resetting database")?;
            "Database reset successfully".to_string()
        }
        DbAction::SeedSampleData => {
            let ids = seed::insert_sample_messages(&store)
                .await
                .context("error inserting test data")?;
            format!("Test data inserted successfully ({} messages)", ids.len())
        }
    };

    info!("{report}");
    Ok(report)
}

/// Single-row edits an operator can make without going through HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEdit {
    Content(String),
    Delete,
    CommitHash(String),
}

pub async fn edit_message(db_path: &Path, id: MessageId, edit: MessageEdit) -> Result<String> {
    let store = MessageStore::open(db_path)
        .await
        .with_context(|| format!("error opening database at {}", db_path.display()))?;

    let (applied, done) = match edit {
        MessageEdit::Content(content) => (store.update_content(id, &content).await?, "updated"),
        MessageEdit::Delete => (store.soft_delete(id).await?, "deleted"),
        MessageEdit::CommitHash(hash) => (store.annotate_commit_hash(id, &hash).await?, "annotated"),
    };

    if !applied {
        bail!("message #{id} not found");
    }
    Ok(format!("Message #{id} {done}"))
}

/// Render messages for the terminal, one line each.
pub async fn list_messages(
    db_path: &Path,
    include_deleted: bool,
    limit: usize,
) -> Result<Vec<String>> {
    let store = MessageStore::open(db_path)
        .await
        .with_context(|| format!("error opening database at {}", db_path.display()))?;
    let query = ListQuery { limit, offset: 0 };

    let messages = if include_deleted {
        store.list_all(query).await?
    } else {
        store.list(query).await?
    };

    Ok(messages.iter().map(format_message).collect())
}

/// Render a live message between the message it replies to and its live
/// replies. A parent that is missing or deleted is shown as unavailable.
pub async fn show_thread(db_path: &Path, id: MessageId) -> Result<Vec<String>> {
    let store = MessageStore::open(db_path)
        .await
        .with_context(|| format!("error opening database at {}", db_path.display()))?;
    let Some(message) = store.get(id).await? else {
        bail!("message #{id} not found");
    };

    let mut lines = Vec::new();
    if let Some(parent) = store.parent_of(id).await? {
        lines.push(format!("in reply to: {}", format_message(&parent)));
    } else if let Some(parent_id) = message.parent_message_id {
        lines.push(format!("in reply to: #{parent_id} (unavailable)"));
    }
    lines.push(format_message(&message));
    for reply in store.replies(id).await? {
        lines.push(format!("  {}", format_message(&reply)));
    }
    Ok(lines)
}

pub fn format_message(message: &Message) -> String {
    let mut line = format!(
        "#{} [{}] {}: {}",
        message.id,
        message.timestamp.format(TIMESTAMP_FORMAT),
        message.author.as_deref().unwrap_or("anonymous"),
        message.content
    );
    if let Some(parent) = message.parent_message_id {
        line.push_str(&format!(" (reply to #{parent})"));
    }
    if let Some(hash) = &message.git_commit_hash {
        line.push_str(&format!(" (commit {hash})"));
    }
    if message.is_deleted {
        line.push_str(" (deleted)");
    }
    line
}
