//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying the numeric user id, the email and an
//! expiry. They are stateless: nothing is stored server-side, so a token
//! stays valid until it expires.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::User;

/// How long a freshly issued token stays valid.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: i64,
    pub email: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// Errors that can occur when issuing or verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Error generating token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("Invalid or expired token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Mints and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer using the default 24 hour expiry.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::hours(TOKEN_TTL_HOURS),
        }
    }

    /// Issues a token for the given user.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_with_ttl(user, self.ttl)
    }

    /// Issues a token with a custom lifetime.
    pub fn issue_with_ttl(&self, user: &User, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            exp: (Utc::now() + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Checks signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}
