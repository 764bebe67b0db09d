use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An image post. `upvotes`/`downvotes` are only ever changed through
/// `PostStore::apply_vote_delta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub caption: String,
    pub image_data: String,
    pub location: Option<String>,
    pub upvotes: u64,
    pub downvotes: u64,
    pub created_at: i64,
}

impl Post {
    pub fn new(user_id: Uuid, caption: String, image_data: String, location: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            caption,
            image_data,
            location,
            upvotes: 0,
            downvotes: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Net votes, i.e. this post's contribution to its author's taste score.
    pub fn net_votes(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }
}
