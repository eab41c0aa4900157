use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use adoptly_core::CoreError;
use adoptly_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("authentication required")]
    Unauthorized,

    #[error("{reason}")]
    BadRequest { field: Option<String>, reason: String },

    #[error("{0}")]
    Conflict(String),

    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(field: &'static str, reason: impl Into<String>) -> Self {
        Self::BadRequest { field: Some(field.to_string()), reason: reason.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, field) = match self {
            ApiError::Core(CoreError::Validation { field, reason }) => {
                (StatusCode::BAD_REQUEST, reason, Some(field.to_string()))
            }
            ApiError::Core(CoreError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{} not found", what), None)
            }
            // Deny without describing what exists
            ApiError::Core(CoreError::Permission(_)) => (
                StatusCode::FORBIDDEN,
                "You do not have access to this resource".to_string(),
                None,
            ),
            ApiError::Core(CoreError::BackendUnavailable(e)) => {
                error!("Backend failure: {:#}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable, please try again".to_string(),
                    None,
                )
            }
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string(), None)
            }
            ApiError::BadRequest { field, reason } => (StatusCode::BAD_REQUEST, reason, field),
            ApiError::Conflict(reason) => (StatusCode::CONFLICT, reason, None),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong, please try again".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            field,
        };

        (status, Json(body)).into_response()
    }
}
