use crate::{
    AppState, auth::current_user_id, dto::AddCommentRequest, errors::ApiError, models::Comment,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// POST /posts/:id/comments
/// Headers: Authorization: Bearer <token>
/// Body: { "text": "..." }
pub async fn add_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let user_id = current_user_id(&headers, &state.jwt_secret)?;
    let user = state.users.get(user_id).ok_or(ApiError::Unauthorized)?;

    let comment = state.posts.add_comment(Comment {
        id: Uuid::new_v4(),
        post_id,
        user_id,
        username: user.username,
        user_profile_image: user.profile_image,
        text: payload.text,
        created_at: Utc::now().timestamp_millis(),
    })?;

    info!("Comment {} added to post {} by user {}", comment.id, post_id, user_id);

    Ok((StatusCode::CREATED, Json(comment)))
}
