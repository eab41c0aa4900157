use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use adoptly_types::events::GatewayEvent;

use crate::dispatcher::Dispatcher;

const PING_INTERVAL: Duration = Duration::from_secs(15);

/// Consecutive unanswered pings before the socket is considered dead.
const MAX_MISSED_PONGS: u8 = 2;

/// Serve a WebSocket whose token was already validated at upgrade time.
/// The socket is push-only: client text frames are ignored.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    user_id: Uuid,
    poll_interval_secs: u64,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} connected to gateway", user_id);

    let ready = GatewayEvent::Ready { user_id, poll_interval_secs };
    if send_event(&mut sender, &ready).await.is_err() {
        return;
    }

    let (conn_id, mut user_rx) = dispatcher.register_user_channel(user_id).await;

    let alive = Arc::new(AtomicBool::new(true));
    let alive_on_recv = alive.clone();

    let mut send_task = tokio::spawn(async move {
        let mut pings = tokio::time::interval(PING_INTERVAL);
        pings.tick().await;
        let mut missed_pongs: u8 = 0;

        loop {
            tokio::select! {
                event = user_rx.recv() => {
                    // Channel closes when a newer connection replaced this one
                    let Some(event) = event else { break };
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                _ = pings.tick() => {
                    missed_pongs = if alive.swap(false, Ordering::Acquire) { 0 } else { missed_pongs + 1 };
                    if missed_pongs >= MAX_MISSED_PONGS {
                        warn!("{} missed {} pongs, dropping push socket", user_id, missed_pongs);
                        break;
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Pong(_) => alive_on_recv.store(true, Ordering::Release),
                Message::Close(_) => break,
                Message::Text(text) => {
                    debug!("{} sent ignored {}-byte text frame", user_id, text.len());
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister_user_channel(user_id, conn_id).await;
    info!("{} disconnected from gateway", user_id);
}

async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: &GatewayEvent,
) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|e| {
        warn!("Failed to encode gateway event: {}", e);
    })?;
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
