use std::sync::Arc;

use uuid::Uuid;

use adoptly_db::Database;
use adoptly_types::models::UnreadCounts;

use crate::blocking;
use crate::error::CoreResult;

/// Unread totals, recomputed from the store on every call. Nothing is cached.
#[derive(Clone)]
pub struct UnreadCounter {
    db: Arc<Database>,
}

impl UnreadCounter {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn unread_message_count(&self, user_id: Uuid) -> CoreResult<u64> {
        Ok(blocking(&self.db, move |db| db.count_unread_messages(user_id)).await?)
    }

    pub async fn unread_notification_count(&self, user_id: Uuid) -> CoreResult<u64> {
        Ok(blocking(&self.db, move |db| db.count_unread_notifications(user_id)).await?)
    }

    /// Both counts from a single store round trip.
    pub async fn counts(&self, user_id: Uuid) -> CoreResult<UnreadCounts> {
        Ok(blocking(&self.db, move |db| {
            Ok(UnreadCounts {
                messages: db.count_unread_messages(user_id)?,
                notifications: db.count_unread_notifications(user_id)?,
            })
        })
        .await?)
    }
}
