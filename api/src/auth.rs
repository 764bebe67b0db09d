use crate::errors::ApiError;
use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub username: String,
    pub exp: usize,
}

pub fn create_token(user_id: &Uuid, username: &str, secret: &str) -> Result<String, ApiError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| ApiError::InternalError("Failed to calculate expiration".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::InternalError(format!("Token Creation failed: {}", e)))
}

pub fn validate_token(headers: &HeaderMap, secret: &str) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized)
}

/// The authenticated caller, or 401.
pub fn current_user_id(headers: &HeaderMap, secret: &str) -> Result<Uuid, ApiError> {
    let claims = validate_token(headers, secret)?;
    Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized)
}

/// The caller if a valid token was sent. Feeds are readable anonymously;
/// a bad token just means no per-viewer vote info.
pub fn optional_user_id(headers: &HeaderMap, secret: &str) -> Option<Uuid> {
    current_user_id(headers, secret).ok()
}
