use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use adoptly_core::ReviewedApplication;
use adoptly_types::api::{
    Claims, CreatePetRequest, DeclineApplicationRequest, ReviewResponse, SubmitApplicationRequest,
    SubmitApplicationResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::notifications::push_notifications;

// -- Pets --

pub async fn list_pets(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.pets.list().await?))
}

pub async fn get_pet(
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.pets.get(pet_id).await?))
}

pub async fn create_pet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = state.services.pets.create(claims.sub, &req.name, &req.species).await?;
    info!("{} listed pet {} ({})", claims.username, pet.name, pet.id);
    Ok((StatusCode::CREATED, Json(pet)))
}

// -- Applications --

/// Submit an application. Reviewer notification failures are reported in
/// the body and never undo the submission.
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitApplicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submitted = state
        .services
        .applications
        .submit(claims.sub, req.pet_id, req.living_situation.as_deref())
        .await?;

    push_notifications(&state, &submitted.notifications).await;

    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            application: submitted.application,
            staff_notified: submitted.staff_notified,
            notify_errors: submitted.notify_errors,
        }),
    ))
}

pub async fn list_pending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.applications.list_pending(claims.sub).await?))
}

/// The caller's own applications, newest first.
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.applications.list_for_applicant(claims.sub).await?))
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.applications.get(application_id, claims.sub).await?))
}

pub async fn approve(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let reviewed = state.services.applications.approve(application_id, claims.sub).await?;
    Ok(Json(review_response(&state, reviewed).await))
}

/// The body is optional; an absent reason declines without one.
pub async fn decline(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    req: Option<Json<DeclineApplicationRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let reason = req.map(|Json(req)| req.reason).unwrap_or_default();
    let reviewed = state
        .services
        .applications
        .decline(application_id, claims.sub, &reason)
        .await?;
    Ok(Json(review_response(&state, reviewed).await))
}

async fn review_response(state: &AppState, reviewed: ReviewedApplication) -> ReviewResponse {
    if let Some(notification) = &reviewed.notification {
        push_notifications(state, std::slice::from_ref(notification)).await;
    }

    ReviewResponse {
        application: reviewed.application,
        notification: reviewed.notification,
        notify_error: reviewed.notify_error,
    }
}
