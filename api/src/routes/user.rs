use crate::{
    AppState,
    auth::{create_token, current_user_id, optional_user_id},
    dto::{
        AuthResponse, LoginRequest, PaginatedResponse, PaginationParams, PostResponse, PublicUserResponse,
        SignupRequest, UpdateProfileRequest, UserResponse,
    },
    errors::ApiError,
    models::User,
    routes::post::to_response,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// POST /auth/signup
/// Body: { "email": "...", "username": "...", "password": "..." }
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let hashed_password = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user = state.users.create(User {
        id: Uuid::new_v4(),
        email: payload.email,
        username: payload.username,
        hashed_password,
        bio: None,
        profile_image: None,
        taste_score: 0,
        total_posts: 0,
        created_at: Utc::now().timestamp(),
    })?;

    let token = create_token(&user.id, &user.username, &state.jwt_secret)?;

    info!("New user registered: {}", user.email);

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// POST /auth/login
/// Body: { "email": "...", "password": "..." }
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let user = state
        .users
        .find_by_email(&payload.email)
        .ok_or(ApiError::InvalidCredentials)?;

    let valid = verify(&payload.password, &user.hashed_password)
        .map_err(|e| ApiError::InternalError(format!("Password verification failed: {}", e)))?;

    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    let token = create_token(&user.id, &user.username, &state.jwt_secret)?;

    info!("User logged in: {}", user.email);

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /users/me
/// Headers: Authorization: Bearer <token>
pub async fn get_current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = current_user_id(&headers, &state.jwt_secret)?;

    let user = state.users.get(user_id).ok_or(ApiError::NotFound)?;

    Ok(Json(user.into()))
}

/// PUT /users/me
/// Headers: Authorization: Bearer <token>
/// Body: { "username": "...", "bio": "...", "profile_image": "..." } (all optional)
pub async fn update_current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;

    let user_id = current_user_id(&headers, &state.jwt_secret)?;

    let user = state.users.update_profile(
        user_id,
        payload.username,
        payload.bio,
        payload.profile_image,
    )?;

    info!("Profile updated: {}", user.id);

    Ok(Json(user.into()))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUserResponse>, ApiError> {
    let user = state.users.get(id).ok_or(ApiError::NotFound)?;

    Ok(Json(user.into()))
}

/// GET /users/:id/posts?page=1&limit=10
pub async fn get_user_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<PostResponse>>, ApiError> {
    if state.users.get(id).is_none() {
        return Err(ApiError::NotFound);
    }

    let viewer = optional_user_id(&headers, &state.jwt_secret);
    let page = params.paginate(state.posts.list(Some(id)));

    Ok(Json(PaginatedResponse {
        data: page
            .data
            .into_iter()
            .map(|post| to_response(&state, post, viewer, false))
            .collect(),
        page: page.page,
        limit: page.limit,
        total: page.total,
    }))
}
