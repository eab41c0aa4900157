use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;

use adoptly_gateway::connection::handle_connection;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;
use crate::extract::Query;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub token: String,
}

/// Browsers cannot set headers on a WebSocket handshake, so the token rides
/// in the query string and is checked before upgrading.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let claims = decode_token(&state.jwt_secret, &query.token).ok_or(ApiError::Unauthorized)?;

    let dispatcher = state.dispatcher.clone();
    let poll_interval_secs = state.poll_interval_secs;
    Ok(ws.on_upgrade(move |socket| {
        handle_connection(socket, dispatcher, claims.sub, poll_interval_secs)
    }))
}
