use crate::models::{Comment, Post, User, VoteKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub taste_score: i64,
    pub total_posts: u64,
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            bio: user.bio,
            profile_image: user.profile_image,
            taste_score: user.taste_score,
            total_posts: user.total_posts,
            created_at: user.created_at,
        }
    }
}

/// What anyone may see of a user.
#[derive(Debug, Serialize)]
pub struct PublicUserResponse {
    pub id: Uuid,
    pub username: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub taste_score: i64,
    pub total_posts: u64,
    pub created_at: i64,
}

impl From<User> for PublicUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            bio: user.bio,
            profile_image: user.profile_image,
            taste_score: user.taste_score,
            total_posts: user.total_posts,
            created_at: user.created_at,
        }
    }
}

/// A post as seen by one viewer.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub username: String,
    pub user_profile_image: Option<String>,
    pub user_vote: Option<VoteKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl PaginationParams {
    pub const MAX_LIMIT: usize = 100;

    /// Slices one page out of `items`; `limit` is clamped to `1..=MAX_LIMIT`.
    pub fn paginate<T>(&self, items: Vec<T>) -> PaginatedResponse<T> {
        let page = self.page.max(1);
        let limit = self.limit.clamp(1, Self::MAX_LIMIT);
        let total = items.len();

        let data = items.into_iter().skip((page - 1).saturating_mul(limit)).take(limit).collect();

        PaginatedResponse {
            data,
            page,
            limit,
            total,
        }
    }
}

fn default_page() -> usize {
    1
}
fn default_limit() -> usize {
    10
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}
