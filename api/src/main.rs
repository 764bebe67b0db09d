// ============================================================================
// TASTE FEED API - image posts, votes, comments and author taste scores
// ============================================================================

// - User signup/login with password hashing
// - JWT authentication & authorization
// - Vote reconciliation (toggle/switch) with post counters and taste scores
// - Pagination, comments, per-user vote rate limiting
// - Proper error handling
// - Structured logging

mod auth;
mod config;
mod dto;
mod errors;
mod models;
mod routes;
mod states;
mod store;
mod voting;

use axum::{
    BoxError, Router,
    error_handling::HandleErrorLayer,
    http::StatusCode,
    routing::{get, post},
};
use config::Config;
use routes::{comment, health, post as posts, user, vote};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use states::AppState;

const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

fn app(state: AppState, config: &Config) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Public routes (no auth required)
        .route("/health", get(health::health_check))
        .route("/auth/signup", post(user::signup))
        .route("/auth/login", post(user::login))
        // Protected routes (auth required)
        .route(
            "/users/me",
            get(user::get_current_user).put(user::update_current_user),
        )
        .route("/users/{id}", get(user::get_user))
        .route("/users/{id}/posts", get(user::get_user_posts))
        .route("/posts", post(posts::create_post).get(posts::get_posts))
        .route("/posts/{id}", get(posts::get_post).delete(posts::delete_post))
        .route("/posts/{id}/vote", post(vote::cast_vote))
        .route("/posts/{id}/comments", post(comment::add_comment))
        // Add state and middleware
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(config.request_timeout)
                .concurrency_limit(config.max_concurrent_requests),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn handle_middleware_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        error!("Middleware error: {}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;

    // Create application state
    let state = AppState::new(&config);
    state.spawn_vote_limiter_pruning(LIMITER_PRUNE_INTERVAL);
    let app = app(state, &config);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("API Endpoints:");
    info!("  GET    /health              - Health check");
    info!("  POST   /auth/signup         - Create account");
    info!("  POST   /auth/login          - Login");
    info!("  GET    /users/me            - Current user with taste score (auth)");
    info!("  PUT    /users/me            - Update profile (auth)");
    info!("  GET    /users/:id           - Public profile");
    info!("  GET    /users/:id/posts     - A user's posts (paginated)");
    info!("  POST   /posts               - Create post (auth)");
    info!("  GET    /posts               - List posts (paginated)");
    info!("  GET    /posts/:id           - Post with comments");
    info!("  DELETE /posts/:id           - Delete post (auth, owner only)");
    info!("  POST   /posts/:id/vote      - Upvote/downvote, repeat to undo (auth)");
    info!("  POST   /posts/:id/comments  - Comment on a post (auth)");

    axum::serve(listener, app).await?;

    Ok(())
}
