use crate::{
    AppState,
    auth::current_user_id,
    dto::VoteRequest,
    errors::ApiError,
    models::VoteKind,
    voting::VoteOutcome,
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use tracing::warn;
use uuid::Uuid;

/// POST /posts/:id/vote
/// Headers: Authorization: Bearer <token>
/// Body: { "vote_type": "UPVOTE" | "DOWNVOTE" }
///
/// Voting the same way twice removes the vote; voting the other way
/// switches it.
pub async fn cast_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteOutcome>, ApiError> {
    let user_id = current_user_id(&headers, &state.jwt_secret)?;
    let kind: VoteKind = payload.vote_type.parse()?;

    if state.vote_limiter.check_key(&user_id).is_err() {
        warn!("Vote rate limit hit by user {}", user_id);
        return Err(ApiError::TooManyRequests);
    }

    let outcome = state.reconciler.cast_vote(user_id, post_id, kind).await?;

    Ok(Json(outcome))
}
