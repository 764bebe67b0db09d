use crate::{
    AppState,
    auth::{current_user_id, optional_user_id},
    dto::{CreatePostRequest, PaginatedResponse, PaginationParams, PostResponse},
    errors::ApiError,
    models::Post,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Renders a post for `viewer`, with the author's username and picture and
/// the viewer's own vote on it.
pub(crate) fn to_response(
    state: &AppState,
    post: Post,
    viewer: Option<Uuid>,
    with_comments: bool,
) -> PostResponse {
    let (username, user_profile_image) = state
        .users
        .get(post.user_id)
        .map(|u| (u.username, u.profile_image))
        .unwrap_or_default();
    let user_vote = viewer.and_then(|viewer| state.votes.kind_for(viewer, post.id));
    let comments = with_comments.then(|| state.posts.comments_for(post.id));

    PostResponse {
        post,
        username,
        user_profile_image,
        user_vote,
        comments,
    }
}

/// POST /posts
/// Headers: Authorization: Bearer <token>
/// Body: { "caption": "...", "image_data": "...", "location": "..." }
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let user_id = current_user_id(&headers, &state.jwt_secret)?;
    state.users.adjust_post_count(user_id, 1)?;

    let post = Post::new(user_id, payload.caption, payload.image_data, payload.location);
    state.posts.insert(post.clone());

    info!("Post created: {} by user {}", post.id, user_id);

    Ok((
        StatusCode::CREATED,
        Json(to_response(&state, post, Some(user_id), true)),
    ))
}

/// GET /posts?page=1&limit=10
pub async fn get_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PaginationParams>,
) -> Json<PaginatedResponse<PostResponse>> {
    let viewer = optional_user_id(&headers, &state.jwt_secret);
    let page = params.paginate(state.posts.list(None));

    Json(PaginatedResponse {
        data: page
            .data
            .into_iter()
            .map(|post| to_response(&state, post, viewer, false))
            .collect(),
        page: page.page,
        limit: page.limit,
        total: page.total,
    })
}

/// GET /posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.posts.get(id).ok_or(ApiError::NotFound)?;
    let viewer = optional_user_id(&headers, &state.jwt_secret);

    Ok(Json(to_response(&state, post, viewer, true)))
}

/// DELETE /posts/:id
/// Headers: Authorization: Bearer <token>
///
/// Votes and comments go with the post, and its net votes leave the
/// author's taste score.
pub async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = current_user_id(&headers, &state.jwt_secret)?;

    let post = state.posts.get(id).ok_or(ApiError::NotFound)?;

    // Check ownership
    if post.user_id != user_id {
        return Err(ApiError::Unauthorized);
    }

    // Counters as of removal, not as of the ownership check.
    let post = state.posts.remove(id).ok_or(ApiError::NotFound)?;
    let dropped = state.votes.remove_for_post(id);
    state.reconciler.withdraw_post(&post).await;

    if let Err(e) = state.users.adjust_post_count(user_id, -1) {
        warn!("Post count for user {} not decremented: {}", user_id, e);
    }

    info!("Post deleted: {} by user {} ({} votes dropped)", id, user_id, dropped);

    Ok(StatusCode::NO_CONTENT)
}
