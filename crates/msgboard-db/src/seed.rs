use msgboard_common::{MessageId, NewMessage, Result};
use tracing::info;

use crate::message_store::MessageStore;

/// Insert the fixed sample conversation used for local development.
///
/// The third row replies to the first one inserted here, so the thread stays
/// intact even when the table already holds other messages.
pub async fn insert_sample_messages(store: &MessageStore) -> Result<Vec<MessageId>> {
    let first = store
        .insert(NewMessage::text("Hello, this is a test message!").by("user1"))
        .await?;
    let second = store
        .insert(NewMessage::text("Testing the chat application.").by("user2"))
        .await?;
    let reply = store
        .insert(
            NewMessage::text("This is a reply to the first message.")
                .by("user3")
                .reply_to(first),
        )
        .await?;

    info!("inserted sample messages {first}, {second}, {reply}");
    Ok(vec![first, second, reply])
}
