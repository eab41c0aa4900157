use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification, UnreadCounts};

/// Events pushed to a single user over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Connection accepted. Clients without a socket fall back to polling
    /// every `poll_interval_secs`.
    Ready { user_id: Uuid, poll_interval_secs: u64 },

    /// A message addressed to this user was stored
    MessageCreate { message: Message },

    /// A notification for this user was stored
    NotificationCreate { notification: Notification },

    /// Fresh unread totals after anything that changes them
    UnreadCounts { counts: UnreadCounts },
}
