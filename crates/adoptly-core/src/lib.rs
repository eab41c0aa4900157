//! Messaging and notification core: one conversation per pair of users,
//! ordered message logs, per-recipient notification fan-out and on-demand
//! unread counts. Every operation takes the acting user explicitly.

pub mod applications;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod messages;
pub mod notifications;
pub mod pets;
pub mod unread;

use std::sync::Arc;

use adoptly_db::Database;
use anyhow::anyhow;
use tracing::error;

pub use applications::{ApplicationWorkflow, ReviewedApplication, SubmittedApplication};
pub use conversations::{ConversationDirectory, OpenedConversation};
pub use directory::UserDirectory;
pub use error::{CoreError, CoreResult};
pub use messages::MessageLog;
pub use notifications::{BroadcastReport, NotificationBroadcaster, NotificationDraft, NotificationStore};
pub use pets::PetCatalog;
pub use unread::UnreadCounter;

/// All services over one database, cheap to clone into handler state.
#[derive(Clone)]
pub struct Services {
    pub conversations: ConversationDirectory,
    pub messages: MessageLog,
    pub notifications: NotificationStore,
    pub broadcaster: NotificationBroadcaster,
    pub unread: UnreadCounter,
    pub applications: ApplicationWorkflow,
    pub pets: PetCatalog,
}

impl Services {
    pub fn new(db: Arc<Database>) -> Self {
        let directory: Arc<dyn UserDirectory> = db.clone();
        Self::with_directory(db, directory)
    }

    /// Resolve broadcast recipients and reviewers through `directory` instead
    /// of the users table.
    pub fn with_directory(db: Arc<Database>, directory: Arc<dyn UserDirectory>) -> Self {
        let broadcaster = NotificationBroadcaster::new(db.clone(), directory.clone());

        Self {
            conversations: ConversationDirectory::new(db.clone()),
            messages: MessageLog::new(db.clone()),
            notifications: NotificationStore::new(db.clone()),
            unread: UnreadCounter::new(db.clone()),
            applications: ApplicationWorkflow::new(db.clone(), directory.clone(), broadcaster.clone()),
            pets: PetCatalog::new(db, directory),
            broadcaster,
        }
    }
}

/// Run a blocking store call off the async runtime.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow!("store task failed: {}", e)
        })?
}
