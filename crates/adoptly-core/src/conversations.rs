use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use adoptly_db::Database;
use adoptly_types::models::{Conversation, ConversationSummary};

use crate::blocking;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone)]
pub struct OpenedConversation {
    pub conversation: Conversation,
    /// True when this call created the conversation.
    pub is_new: bool,
}

/// Keeps at most one conversation per unordered pair of users.
#[derive(Clone)]
pub struct ConversationDirectory {
    db: Arc<Database>,
}

impl ConversationDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Return the conversation between `user_a` and `user_b`, creating it on
    /// first contact. `(a, b)` and `(b, a)` resolve to the same row.
    pub async fn create_or_get(&self, user_a: Uuid, user_b: Uuid) -> CoreResult<OpenedConversation> {
        if user_a == user_b {
            return Err(CoreError::validation(
                "participant_id",
                "cannot start a conversation with yourself",
            ));
        }

        let new_id = Uuid::new_v4();
        let (conversation, is_new) = blocking(&self.db, move |db| {
            db.create_or_get_conversation(new_id, user_a, user_b)
        })
        .await
        .map_err(|e| CoreError::from_insert(e, "user"))?;

        if is_new {
            info!("Conversation {} opened between {} and {}", conversation.id, user_a, user_b);
        } else {
            debug!("Reusing conversation {} for {} and {}", conversation.id, user_a, user_b);
        }

        Ok(OpenedConversation { conversation, is_new })
    }

    /// Conversations `user_id` takes part in, most recently active first.
    pub async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<ConversationSummary>> {
        Ok(blocking(&self.db, move |db| db.get_conversation_summaries(user_id)).await?)
    }

    /// Fetch a conversation on behalf of `user_id`, who must be a participant.
    pub async fn get_for_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> CoreResult<Conversation> {
        let conversation = blocking(&self.db, move |db| db.get_conversation(conversation_id))
            .await?
            .ok_or(CoreError::NotFound("conversation"))?;

        if !conversation.includes(user_id) {
            return Err(CoreError::Permission("not a participant of this conversation"));
        }

        Ok(conversation)
    }
}
