use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use adoptly_types::events::GatewayEvent;

/// Routes events to connected users. Delivery is best effort: a user with no
/// open socket simply picks the change up on their next poll.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-user channel. A newer connection replaces an older one.
    /// Returns (conn_id, receiver).
    pub async fn register_user_channel(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user channel, but only if conn_id matches.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send an event to one user. Returns false if they are not connected.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> bool {
        let channels = self.inner.user_channels.read().await;
        match channels.get(&user_id) {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.user_channels.read().await.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoptly_types::models::UnreadCounts;

    fn counts(messages: u64) -> GatewayEvent {
        GatewayEvent::UnreadCounts {
            counts: UnreadCounts { messages, notifications: 0 },
        }
    }

    #[tokio::test]
    async fn delivers_only_to_target() {
        let dispatcher = Dispatcher::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (_, mut alice_rx) = dispatcher.register_user_channel(alice).await;
        let (_, mut bob_rx) = dispatcher.register_user_channel(bob).await;

        assert!(dispatcher.send_to_user(alice, counts(1)).await);

        assert!(matches!(
            alice_rx.try_recv(),
            Ok(GatewayEvent::UnreadCounts { counts: UnreadCounts { messages: 1, .. } })
        ));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_user_is_reported() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.send_to_user(Uuid::new_v4(), counts(1)).await);
    }

    #[tokio::test]
    async fn stale_connection_cannot_unregister_newer_one() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (_new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        dispatcher.unregister_user_channel(user, old_conn).await;
        assert!(dispatcher.is_online(user).await);

        assert!(dispatcher.send_to_user(user, counts(3)).await);
        assert!(new_rx.try_recv().is_ok());
    }
}
