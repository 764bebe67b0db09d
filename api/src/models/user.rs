use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    /// Running sum of net votes received on this user's posts.
    pub taste_score: i64,
    pub total_posts: u64,
    pub created_at: i64,
}
