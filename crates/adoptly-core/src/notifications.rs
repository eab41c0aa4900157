use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use adoptly_db::Database;
use adoptly_types::models::{Notification, NotificationKind, NotificationPayload, Role};

use crate::blocking;
use crate::directory::{UserDirectory, resolve_by_role};
use crate::error::{CoreError, CoreResult};

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 200;

/// Everything about a notification except who receives it.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub payload: NotificationPayload,
}

impl NotificationDraft {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        payload: NotificationPayload,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            payload,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }
}

#[derive(Debug)]
pub struct RecipientResult {
    pub recipient_id: Uuid,
    pub result: CoreResult<Notification>,
}

/// Per-recipient results of a broadcast. Successful notifications stay
/// stored even when others failed.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub outcomes: Vec<RecipientResult>,
}

impl BroadcastReport {
    /// True when every recipient was notified, including when there were none.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn notified_count(&self) -> usize {
        self.delivered().count()
    }

    pub fn delivered(&self) -> impl Iterator<Item = &Notification> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (Uuid, &CoreError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.recipient_id, e)))
    }
}

/// Creates notifications: one for a single recipient, or one per user
/// holding any of a set of roles.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    db: Arc<Database>,
    directory: Arc<dyn UserDirectory>,
}

impl NotificationBroadcaster {
    pub fn new(db: Arc<Database>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { db, directory }
    }

    /// A notification must have an owner; a missing recipient is rejected
    /// before anything is stored.
    pub async fn notify(
        &self,
        recipient_id: Option<Uuid>,
        draft: NotificationDraft,
    ) -> CoreResult<Notification> {
        let Some(recipient_id) = recipient_id else {
            warn!("Refusing {} notification without a recipient", draft.kind().as_str());
            return Err(CoreError::validation("recipient_id", "recipient is required"));
        };

        let notification = blocking(&self.db, move |db| {
            db.insert_notification(
                Uuid::new_v4(),
                recipient_id,
                &draft.title,
                &draft.message,
                &draft.payload,
            )
        })
        .await
        .map_err(|e| CoreError::from_insert(e, "recipient"))?;

        debug!(
            "Notification {} ({}) created for {}",
            notification.id,
            notification.kind.as_str(),
            recipient_id
        );
        Ok(notification)
    }

    /// Notify every user whose role is in `roles`. Each recipient is handled
    /// independently; only a failure to resolve recipients fails the call.
    pub async fn broadcast_to_roles(
        &self,
        roles: &[Role],
        draft: NotificationDraft,
    ) -> CoreResult<BroadcastReport> {
        let mut wanted: Vec<Role> = Vec::with_capacity(roles.len());
        for role in roles {
            if !wanted.contains(role) {
                wanted.push(*role);
            }
        }

        let mut seen = HashSet::new();
        let recipients: Vec<Uuid> = resolve_by_role(&self.directory, wanted)
            .await?
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        if recipients.is_empty() {
            info!("No recipients for {} broadcast", draft.kind().as_str());
            return Ok(BroadcastReport::default());
        }

        let outcomes = join_all(recipients.into_iter().map(|recipient_id| {
            let draft = draft.clone();
            async move {
                RecipientResult {
                    recipient_id,
                    result: self.notify(Some(recipient_id), draft).await,
                }
            }
        }))
        .await;

        let report = BroadcastReport { outcomes };
        for (recipient_id, err) in report.failures() {
            warn!("Broadcast to {} failed: {}", recipient_id, err);
        }
        info!(
            "{} broadcast: {}/{} recipients notified",
            draft.kind().as_str(),
            report.notified_count(),
            report.outcomes.len()
        );

        Ok(report)
    }
}

/// A recipient's view of their notifications. Every operation is scoped to
/// the owner.
#[derive(Clone)]
pub struct NotificationStore {
    db: Arc<Database>,
}

impl NotificationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Newest first. `limit` defaults to 50 and is capped at 200.
    pub async fn list(&self, owner_id: Uuid, limit: Option<u32>) -> CoreResult<Vec<Notification>> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
        Ok(blocking(&self.db, move |db| db.get_notifications(owner_id, limit)).await?)
    }

    pub async fn list_unread(&self, owner_id: Uuid) -> CoreResult<Vec<Notification>> {
        Ok(blocking(&self.db, move |db| db.get_unread_notifications(owner_id)).await?)
    }

    /// Idempotent: marking an already-read notification succeeds.
    pub async fn mark_read(&self, notification_id: Uuid, owner_id: Uuid) -> CoreResult<Notification> {
        let notification = self.owned(notification_id, owner_id).await?;
        if notification.read {
            return Ok(notification);
        }

        blocking(&self.db, move |db| {
            db.mark_notification_read(notification_id)?;
            db.get_notification(notification_id)
        })
        .await?
        .ok_or(CoreError::NotFound("notification"))
    }

    pub async fn mark_all_read(&self, owner_id: Uuid) -> CoreResult<usize> {
        Ok(blocking(&self.db, move |db| db.mark_all_notifications_read(owner_id)).await?)
    }

    pub async fn delete(&self, notification_id: Uuid, owner_id: Uuid) -> CoreResult<()> {
        self.owned(notification_id, owner_id).await?;
        blocking(&self.db, move |db| db.delete_notification(notification_id)).await?;
        debug!("Notification {} deleted by {}", notification_id, owner_id);
        Ok(())
    }

    pub async fn delete_all(&self, owner_id: Uuid) -> CoreResult<usize> {
        Ok(blocking(&self.db, move |db| db.delete_all_notifications(owner_id)).await?)
    }

    async fn owned(&self, notification_id: Uuid, owner_id: Uuid) -> CoreResult<Notification> {
        let notification = blocking(&self.db, move |db| db.get_notification(notification_id))
            .await?
            .ok_or(CoreError::NotFound("notification"))?;

        if notification.recipient_id != owner_id {
            return Err(CoreError::Permission("notification belongs to another user"));
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NotificationDraft {
        NotificationDraft::new(
            "Application Approved",
            "Your application for Biscuit has been approved!",
            NotificationPayload::ApplicationApproved {
                application_id: Uuid::new_v4(),
                pet_id: Uuid::new_v4(),
                pet_name: "Biscuit".into(),
            },
        )
    }

    fn setup() -> (Arc<Database>, NotificationBroadcaster, NotificationStore, Uuid) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = Uuid::new_v4();
        db.create_user(user, "ada", "Ada", "x", Role::Adopter).unwrap();
        let directory: Arc<dyn UserDirectory> = db.clone();
        (
            db.clone(),
            NotificationBroadcaster::new(db.clone(), directory),
            NotificationStore::new(db),
            user,
        )
    }

    #[tokio::test]
    async fn notify_unknown_recipient_is_not_found() {
        let (_, broadcaster, _, _) = setup();
        let err = broadcaster.notify(Some(Uuid::new_v4()), draft()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound("recipient")));
    }

    #[tokio::test]
    async fn other_users_cannot_touch_notification() {
        let (_, broadcaster, store, user) = setup();
        let n = broadcaster.notify(Some(user), draft()).await.unwrap();
        let stranger = Uuid::new_v4();

        assert!(matches!(
            store.mark_read(n.id, stranger).await.unwrap_err(),
            CoreError::Permission(_)
        ));
        assert!(matches!(
            store.delete(n.id, stranger).await.unwrap_err(),
            CoreError::Permission(_)
        ));
        assert!(!store.list(user, None).await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let (_, broadcaster, store, user) = setup();
        let n = broadcaster.notify(Some(user), draft()).await.unwrap();

        assert!(store.mark_read(n.id, user).await.unwrap().read);
        assert!(store.mark_read(n.id, user).await.unwrap().read);
        assert!(store.list_unread(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_then_delete_again_is_not_found() {
        let (_, broadcaster, store, user) = setup();
        let n = broadcaster.notify(Some(user), draft()).await.unwrap();

        store.delete(n.id, user).await.unwrap();
        assert!(matches!(
            store.delete(n.id, user).await.unwrap_err(),
            CoreError::NotFound("notification")
        ));
    }

    #[tokio::test]
    async fn list_limit_is_capped() {
        let (db, broadcaster, store, user) = setup();
        for _ in 0..3 {
            broadcaster.notify(Some(user), draft()).await.unwrap();
        }
        assert_eq!(store.list(user, Some(2)).await.unwrap().len(), 2);
        assert_eq!(store.list(user, Some(10_000)).await.unwrap().len(), 3);
        assert_eq!(db.count_unread_notifications(user).unwrap(), 3);
    }
}
