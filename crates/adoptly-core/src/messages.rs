use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use adoptly_db::Database;
use adoptly_types::models::{Conversation, Message};

use crate::blocking;
use crate::error::{CoreError, CoreResult};

/// Append-only message history per conversation, with per-receiver read state.
#[derive(Clone)]
pub struct MessageLog {
    db: Arc<Database>,
}

impl MessageLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a message from `sender_id` to `receiver_id`, who must be the two
    /// participants of the conversation. The body is stored trimmed.
    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: &str,
    ) -> CoreResult<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(CoreError::validation("body", "message cannot be empty"));
        }

        let conversation = self.conversation(conversation_id).await?;
        match conversation.counterpart_of(sender_id) {
            None => return Err(CoreError::Permission("sender is not a participant")),
            Some(other) if other != receiver_id => {
                return Err(CoreError::validation(
                    "receiver_id",
                    "receiver must be the other participant",
                ));
            }
            Some(_) => {}
        }

        let body = body.to_string();
        let message = blocking(&self.db, move |db| {
            db.insert_message(Uuid::new_v4(), conversation_id, sender_id, receiver_id, &body)
        })
        .await?;

        debug!(
            "Message {} (seq {}) stored in conversation {}",
            message.id, message.seq, conversation_id
        );
        Ok(message)
    }

    /// Full history, ascending. Only participants may read it.
    pub async fn list(&self, conversation_id: Uuid, viewer_id: Uuid) -> CoreResult<Vec<Message>> {
        let conversation = self.conversation(conversation_id).await?;
        if !conversation.includes(viewer_id) {
            return Err(CoreError::Permission("not a participant of this conversation"));
        }

        Ok(blocking(&self.db, move |db| db.get_messages(conversation_id)).await?)
    }

    /// Mark one message read. Only its receiver may do this; repeating the
    /// call is a no-op.
    pub async fn mark_read(&self, message_id: Uuid, reader_id: Uuid) -> CoreResult<Message> {
        let message = blocking(&self.db, move |db| db.get_message(message_id))
            .await?
            .ok_or(CoreError::NotFound("message"))?;

        if message.receiver_id != reader_id {
            return Err(CoreError::Permission("only the receiver can mark a message read"));
        }
        if message.read {
            return Ok(message);
        }

        blocking(&self.db, move |db| {
            db.mark_message_read(message_id)?;
            db.get_message(message_id)
        })
        .await?
        .ok_or(CoreError::NotFound("message"))
    }

    /// Mark everything `receiver_id` received in the conversation as read.
    /// Returns how many messages changed state.
    pub async fn mark_all_read(&self, conversation_id: Uuid, receiver_id: Uuid) -> CoreResult<usize> {
        let conversation = self.conversation(conversation_id).await?;
        if !conversation.includes(receiver_id) {
            return Err(CoreError::Permission("not a participant of this conversation"));
        }

        let changed = blocking(&self.db, move |db| {
            db.mark_conversation_read(conversation_id, receiver_id)
        })
        .await?;

        debug!("{} marked {} messages read in {}", receiver_id, changed, conversation_id);
        Ok(changed)
    }

    async fn conversation(&self, conversation_id: Uuid) -> CoreResult<Conversation> {
        blocking(&self.db, move |db| db.get_conversation(conversation_id))
            .await?
            .ok_or(CoreError::NotFound("conversation"))
    }
}
