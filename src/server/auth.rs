//! Bearer-token authentication for protected routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use super::AppState;

/// Authenticated user info, added to request extensions after auth
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

/// Authentication middleware
///
/// Rejects the request with 401 before the handler runs unless it carries a
/// valid, unexpired `Authorization: Bearer <token>` header.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token.trim(),
        None => {
            return ApiError::Auth("Missing or malformed bearer token".into()).into_response();
        }
    };

    match state.tokens.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser {
                id: claims.id,
                email: claims.email,
            });
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!("Rejected token: {}", e);
            ApiError::Auth("Invalid or expired token".into()).into_response()
        }
    }
}
