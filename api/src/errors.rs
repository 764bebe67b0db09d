use crate::{store::StoreError, voting::VoteError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    InvalidCredentials,
    UserAlreadyExists(String),
    Unauthorized,
    NotFound,
    Conflict(String),
    TooManyRequests,
    ValidationError(String),
    InternalError(String),
}

/// Convert our custom errors to HTTP responses
///
/// Internal details are logged here and never sent to the client.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
            ApiError::UserAlreadyExists(what) => (StatusCode::CONFLICT, format!("User with this {} already exists", what)),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, "Too many votes, slow down".to_string()),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (
            status,
            Json(serde_json::json!({
              "error": message
            })),
        )
            .into_response()
    }
}

impl From<VoteError> for ApiError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::PostNotFound => ApiError::NotFound,
            VoteError::InvalidVoteKind(_) => ApiError::ValidationError(err.to_string()),
            VoteError::DuplicateVote | VoteError::Conflict => ApiError::Conflict(err.to_string()),
            VoteError::ScoreUpdateFailed { .. } | VoteError::Store(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::AlreadyExists(what) => ApiError::UserAlreadyExists(what.to_string()),
            StoreError::DuplicateVote => ApiError::Conflict(err.to_string()),
            StoreError::NegativeCounter(_) | StoreError::Unavailable(_) => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}
