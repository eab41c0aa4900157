use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use tracing::{error, info, warn};
use uuid::Uuid;

use adoptly_core::Services;
use adoptly_db::Database;
use adoptly_gateway::dispatcher::Dispatcher;
use adoptly_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use adoptly_types::models::Role;

use crate::error::ApiError;
use crate::extract::Json;

const TOKEN_LIFETIME_DAYS: i64 = 30;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub services: Services,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
    /// Required to register as staff or admin. `None` disables staff signup.
    pub staff_signup_code: Option<String>,
    pub poll_interval_secs: u64,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        jwt_secret: String,
        staff_signup_code: Option<String>,
        poll_interval_secs: u64,
    ) -> AppState {
        Arc::new(Self {
            services: Services::new(db.clone()),
            db,
            dispatcher: Dispatcher::new(),
            jwt_secret,
            staff_signup_code,
            poll_interval_secs,
        })
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::bad_request("username", "username must be 3 to 32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password", "password must be at least 8 characters"));
    }
    let display_name = req.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(ApiError::bad_request("display_name", "display name is required"));
    }

    let role = req.role.unwrap_or(Role::Adopter);
    if role != Role::Adopter {
        let code_matches = match (&state.staff_signup_code, &req.staff_code) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        };
        if !code_matches {
            warn!("Rejected {} signup for '{}': bad staff code", role, username);
            return Err(ApiError::bad_request("staff_code", "a valid staff code is required"));
        }
    }

    let user_id = Uuid::new_v4();
    let db = state.db.clone();
    let password = req.password;
    let name = username.clone();

    // Hashing and the insert both block
    let created = tokio::task::spawn_blocking(move || -> Result<bool, ApiError> {
        if db.get_user_by_username(&name).map_err(internal)?.is_some() {
            return Ok(false);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!("Password hashing failed: {}", e);
                ApiError::Internal
            })?
            .to_string();

        store_user(&db, user_id, &name, &display_name, &password_hash, role)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    if !created {
        return Err(ApiError::Conflict("username is already taken".into()));
    }

    info!("Registered {} '{}' ({})", role, username, user_id);

    let token = create_token(&state.jwt_secret, user_id, &username, role)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let username = req.username.trim().to_string();

    let user = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let row = db
            .get_user_by_username(&username)
            .map_err(internal)?
            .ok_or(ApiError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&row.password).map_err(|e| {
            error!("Stored password hash for '{}' is unreadable: {}", row.username, e);
            ApiError::Internal
        })?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        row.to_user().map_err(internal)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    let token = create_token(&state.jwt_secret, user.id, &user.username, user.role)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        role: user.role,
        token,
    }))
}

/// Insert a new account. Returns `false` when the username is taken, including
/// when a concurrent signup won the race after our lookup.
fn store_user(
    db: &Database,
    user_id: Uuid,
    username: &str,
    display_name: &str,
    password_hash: &str,
    role: Role,
) -> Result<bool, ApiError> {
    match db.create_user(user_id, username, display_name, password_hash, role) {
        Ok(()) => Ok(true),
        Err(e) if adoptly_db::is_unique_violation(&e) => Ok(false),
        Err(e) => Err(internal(e)),
    }
}

fn create_token(secret: &str, user_id: Uuid, username: &str, role: Role) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|e| {
        error!("Token encoding failed: {}", e);
        ApiError::Internal
    })
}

/// Validate a token and return its claims. Expired or forged tokens yield `None`.
pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Auth store failure: {:#}", e);
    ApiError::Internal
}
