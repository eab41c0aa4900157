use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use adoptly_types::api::{
    Claims, CreateConversationRequest, CreateConversationResponse, SendMessageRequest,
    UpdatedResponse,
};
use adoptly_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::notifications::push_unread_counts;

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.services.conversations.list_for_user(claims.sub).await?;
    Ok(Json(summaries))
}

/// Open the conversation with `participant_id`, creating it on first contact.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let opened = state
        .services
        .conversations
        .create_or_get(claims.sub, req.participant_id)
        .await?;

    let status = if opened.is_new { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(CreateConversationResponse {
            conversation: opened.conversation,
            is_new: opened.is_new,
        }),
    ))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.services.messages.list(conversation_id, claims.sub).await?;
    Ok(Json(messages))
}

/// Send to the other participant of the conversation.
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .services
        .conversations
        .get_for_participant(conversation_id, claims.sub)
        .await?;
    let receiver_id = conversation
        .counterpart_of(claims.sub)
        .ok_or(ApiError::Internal)?;

    let message = state
        .services
        .messages
        .send(conversation_id, claims.sub, receiver_id, &req.body)
        .await?;

    state
        .dispatcher
        .send_to_user(receiver_id, GatewayEvent::MessageCreate { message: message.clone() })
        .await;
    push_unread_counts(&state, receiver_id).await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_conversation_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .services
        .messages
        .mark_all_read(conversation_id, claims.sub)
        .await?;

    if updated > 0 {
        push_unread_counts(&state, claims.sub).await;
    }

    Ok(Json(UpdatedResponse { success: true, updated }))
}

pub async fn mark_message_read(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.services.messages.mark_read(message_id, claims.sub).await?;
    push_unread_counts(&state, claims.sub).await;
    Ok(Json(message))
}
