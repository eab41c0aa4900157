use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use adoptly_core::{BroadcastReport, CoreError, NotificationDraft};
use adoptly_types::api::{
    BroadcastRequest, BroadcastResponse, Claims, NotifyRequest, RecipientOutcome, UpdatedResponse,
};
use adoptly_types::events::GatewayEvent;
use adoptly_types::models::{Notification, Role};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<u32>,
    /// Only unread notifications.
    #[serde(default)]
    pub unread: bool,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = &state.services.notifications;
    let notifications = if query.unread {
        store.list_unread(claims.sub).await?
    } else {
        store.list(claims.sub, query.limit).await?
    };
    Ok(Json(notifications))
}

/// Staff send a single notification.
pub async fn notify(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NotifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !claims.role.is_staff() {
        return Err(CoreError::Permission("only staff may send notifications").into());
    }

    let draft = NotificationDraft::new(req.title, req.message, req.payload);
    let notification = state.services.broadcaster.notify(req.recipient_id, draft).await?;

    push_notifications(&state, std::slice::from_ref(&notification)).await;

    Ok((StatusCode::CREATED, Json(notification)))
}

/// Admins notify every user holding one of `roles`. Partial failure still
/// answers 200 with per-recipient outcomes.
pub async fn broadcast(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BroadcastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.role != Role::Admin {
        return Err(CoreError::Permission("only admins may broadcast").into());
    }

    let draft = NotificationDraft::new(req.title, req.message, req.payload);
    let report = state.services.broadcaster.broadcast_to_roles(&req.roles, draft).await?;

    let delivered: Vec<Notification> = report.delivered().cloned().collect();
    push_notifications(&state, &delivered).await;

    info!(
        "{} broadcast to {:?}: {}/{} notified",
        claims.username,
        req.roles,
        report.notified_count(),
        report.outcomes.len()
    );

    Ok(Json(broadcast_response(report)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state
        .services
        .notifications
        .mark_read(notification_id, claims.sub)
        .await?;
    push_unread_counts(&state, claims.sub).await;
    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.services.notifications.mark_all_read(claims.sub).await?;
    if updated > 0 {
        push_unread_counts(&state, claims.sub).await;
    }
    Ok(Json(UpdatedResponse { success: true, updated }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .notifications
        .delete(notification_id, claims.sub)
        .await?;
    push_unread_counts(&state, claims.sub).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.services.notifications.delete_all(claims.sub).await?;
    push_unread_counts(&state, claims.sub).await;
    Ok(Json(UpdatedResponse { success: true, updated }))
}

pub async fn unread_counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let counts = state.services.unread.counts(claims.sub).await?;
    Ok(Json(counts))
}

/// Push new notifications to connected recipients, followed by their
/// refreshed unread counts.
pub(crate) async fn push_notifications(state: &AppState, notifications: &[Notification]) {
    for notification in notifications {
        let recipient_id = notification.recipient_id;
        let online = state
            .dispatcher
            .send_to_user(
                recipient_id,
                GatewayEvent::NotificationCreate { notification: notification.clone() },
            )
            .await;
        if online {
            push_unread_counts(state, recipient_id).await;
        }
    }
}

/// Best effort: an offline user, or a failed count, just waits for the next poll.
pub(crate) async fn push_unread_counts(state: &AppState, user_id: Uuid) {
    if !state.dispatcher.is_online(user_id).await {
        return;
    }
    match state.services.unread.counts(user_id).await {
        Ok(counts) => {
            state
                .dispatcher
                .send_to_user(user_id, GatewayEvent::UnreadCounts { counts })
                .await;
        }
        Err(e) => debug!("Skipping unread push for {}: {}", user_id, e),
    }
}

fn broadcast_response(report: BroadcastReport) -> BroadcastResponse {
    let success = report.success();
    let notified_count = report.notified_count();

    let outcomes = report
        .outcomes
        .into_iter()
        .map(|outcome| match outcome.result {
            Ok(notification) => RecipientOutcome {
                recipient_id: outcome.recipient_id,
                success: true,
                notification: Some(notification),
                error: None,
            },
            Err(e) => RecipientOutcome {
                recipient_id: outcome.recipient_id,
                success: false,
                notification: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    BroadcastResponse { success, notified_count, outcomes }
}
