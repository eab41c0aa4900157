use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AdoptionApplication, Conversation, Notification, NotificationPayload, Role,
};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the push gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Errors --

/// Body returned for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub field: Option<String>,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: String,
    /// Defaults to adopter. Staff and admin need `staff_code`.
    pub role: Option<Role>,
    pub staff_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConversationRequest {
    pub participant_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateConversationResponse {
    pub conversation: Conversation,
    pub is_new: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

/// Result of a bulk mark-read or delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub success: bool,
    pub updated: usize,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyRequest {
    pub recipient_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub payload: NotificationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastRequest {
    pub roles: Vec<Role>,
    pub title: String,
    pub message: String,
    pub payload: NotificationPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient_id: Uuid,
    pub success: bool,
    pub notification: Option<Notification>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    /// True only when every recipient was notified.
    pub success: bool,
    pub notified_count: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

// -- Pets & applications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePetRequest {
    pub name: String,
    pub species: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitApplicationRequest {
    pub pet_id: Option<Uuid>,
    pub living_situation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclineApplicationRequest {
    #[serde(default)]
    pub reason: String,
}

/// A completed review. `notify_error` is set when the applicant could not be
/// notified; the review itself still stands.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub application: AdoptionApplication,
    pub notification: Option<Notification>,
    pub notify_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitApplicationResponse {
    pub application: AdoptionApplication,
    pub staff_notified: usize,
    pub notify_errors: Vec<String>,
}
