pub mod comment;
pub mod health;
pub mod post;
pub mod user;
pub mod vote;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        AppState,
        auth::create_token,
        config::Config,
        models::{Post, User},
    };
    use axum::http::{HeaderMap, HeaderValue, header};
    use std::{num::NonZeroU32, time::Duration};
    use uuid::Uuid;

    pub const SECRET: &str = "test-secret";

    pub fn state_with_vote_rate(per_second: u32) -> AppState {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: SECRET.into(),
            request_timeout: Duration::from_secs(5),
            max_concurrent_requests: 16,
            vote_rate_per_second: NonZeroU32::new(per_second).unwrap(),
        };
        AppState::new(&config)
    }

    pub fn state() -> AppState {
        state_with_vote_rate(1000)
    }

    /// Registers a user and returns it with an auth header for it.
    pub fn user(state: &AppState, username: &str) -> (User, HeaderMap) {
        let user = state
            .users
            .create(User {
                id: Uuid::new_v4(),
                email: format!("{}@example.com", username),
                username: username.into(),
                hashed_password: String::new(),
                bio: None,
                profile_image: None,
                taste_score: 0,
                total_posts: 0,
                created_at: 0,
            })
            .unwrap();

        let token = create_token(&user.id, &user.username, SECRET).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        (user, headers)
    }

    pub fn post_by(state: &AppState, author: &User) -> Post {
        let post = Post::new(author.id, "Porter by the fire".into(), "aW1hZ2U=".into(), None);
        state.posts.insert(post.clone());
        state.users.adjust_post_count(author.id, 1).unwrap();
        post
    }
}
