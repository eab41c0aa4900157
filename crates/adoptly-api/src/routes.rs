use axum::{
    Json, Router, middleware,
    routing::{delete, get, post},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::{applications, conversations, gateway, notifications};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/conversations/{conversation_id}/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route(
            "/conversations/{conversation_id}/read",
            post(conversations::mark_conversation_read),
        )
        .route("/messages/{message_id}/read", post(conversations::mark_message_read))
        .route(
            "/notifications",
            get(notifications::list_notifications)
                .post(notifications::notify)
                .delete(notifications::delete_all),
        )
        .route("/notifications/broadcast", post(notifications::broadcast))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route(
            "/notifications/{notification_id}",
            delete(notifications::delete_notification),
        )
        .route("/unread", get(notifications::unread_counts))
        .route("/pets", get(applications::list_pets).post(applications::create_pet))
        .route("/pets/{pet_id}", get(applications::get_pet))
        .route("/applications", post(applications::submit_application))
        .route("/applications/pending", get(applications::list_pending))
        .route("/applications/mine", get(applications::my_applications))
        .route("/applications/{application_id}", get(applications::get_application))
        .route("/applications/{application_id}/approve", post(applications::approve))
        .route("/applications/{application_id}/decline", post(applications::decline))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::require_auth,
        ));

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/gateway", get(gateway::ws_upgrade))
        .route("/health", get(health));

    Router::new().merge(public).merge(protected).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
