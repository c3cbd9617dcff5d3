//! Registration, login and profile updates.
//!
//! Passwords are hashed with bcrypt (cost 10) before storage. The hash never
//! leaves the store: responses echo the [`User`] record without it.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::auth::AuthUser;
use super::error::ApiError;
use super::tokens::TokenIssuer;
use super::{ApiJson, AppState};
use crate::db::{UserRepoError, UserRepository};
use crate::models::User;

/// bcrypt work factor for stored password hashes.
pub const BCRYPT_COST: u32 = 10;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the user it was issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: String,
}

/// Creates a user and signs them in.
pub async fn register(
    users: &UserRepository,
    tokens: &TokenIssuer,
    req: RegisterRequest,
) -> Result<AuthResponse, ApiError> {
    if req.email.is_empty() || req.password.is_empty() || req.name.is_empty() {
        return Err(ApiError::Validation("All fields are required".into()));
    }

    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(ApiError::internal("Error hashing password"))?
        .map_err(ApiError::internal("Error hashing password"))?;

    let user = match users.create(&req.email, &hash, &req.name).await {
        Ok(user) => user,
        Err(UserRepoError::DuplicateEmail) => {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(ApiError::internal("Error creating user")(e)),
    };

    let token = tokens
        .issue(&user)
        .map_err(ApiError::internal("Error generating token"))?;

    tracing::info!("Registered user {} ({})", user.id, user.email);
    Ok(AuthResponse { token, user })
}

/// Hash checked on a login for an unknown email, so that path costs the
/// same bcrypt work as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| bcrypt::hash("recipegen-dummy", BCRYPT_COST).unwrap_or_default())
}

/// Checks credentials and issues a token.
///
/// Unknown email, empty password and wrong password all fail the same way,
/// and all of them run one bcrypt verification.
pub async fn login(
    users: &UserRepository,
    tokens: &TokenIssuer,
    req: LoginRequest,
) -> Result<AuthResponse, ApiError> {
    let creds = users
        .find_by_email(&req.email)
        .await
        .map_err(ApiError::internal("Error fetching user"))?;

    let (user, stored_hash) = match creds {
        Some(creds) => (Some(creds.user), Some(creds.password_hash)),
        None => (None, None),
    };

    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || {
        let hash = stored_hash.as_deref().unwrap_or_else(|| dummy_hash());
        let verified = bcrypt::verify(&password, hash).unwrap_or(false);
        verified && !password.is_empty()
    })
    .await
    .map_err(ApiError::internal("Error verifying password"))?;

    let user = match user {
        Some(user) if matches => user,
        _ => return Err(ApiError::Auth(INVALID_CREDENTIALS.into())),
    };

    let token = tokens
        .issue(&user)
        .map_err(ApiError::internal("Error generating token"))?;

    Ok(AuthResponse { token, user })
}

pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let response = register(&state.users, &state.tokens, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    login(&state.users, &state.tokens, req).await.map(Json)
}

pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<ProfileUpdate>,
) -> Result<Json<ProfileUpdate>, ApiError> {
    if req.name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }

    let updated = state
        .users
        .update_name(user.id, &req.name)
        .await
        .map_err(ApiError::internal("Error updating name"))?;

    if !updated {
        return Err(ApiError::NotFound("User not found".into()));
    }

    Ok(Json(req))
}
