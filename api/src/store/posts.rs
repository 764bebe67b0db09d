use super::{PostStore, StoreError, StoreResult};
use crate::models::{Comment, Post};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryPostStore {
    posts: DashMap<Uuid, Post>,
    comments: DashMap<Uuid, Vec<Comment>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    pub fn get(&self, post_id: Uuid) -> Option<Post> {
        self.posts.get(&post_id).map(|p| p.clone())
    }

    /// All posts, newest first. `author` narrows to one user's posts.
    pub fn list(&self, author: Option<Uuid>) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| author.is_none_or(|id| entry.user_id == id))
            .map(|entry| entry.value().clone())
            .collect();

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }

    /// Removes the post together with its comments.
    pub fn remove(&self, post_id: Uuid) -> Option<Post> {
        self.comments.remove(&post_id);
        self.posts.remove(&post_id).map(|(_, post)| post)
    }

    pub fn add_comment(&self, comment: Comment) -> StoreResult<Comment> {
        if !self.posts.contains_key(&comment.post_id) {
            return Err(StoreError::NotFound);
        }

        self.comments
            .entry(comment.post_id)
            .or_default()
            .push(comment.clone());
        Ok(comment)
    }

    /// Comments on a post, oldest first.
    pub fn comments_for(&self, post_id: Uuid) -> Vec<Comment> {
        self.comments
            .get(&post_id)
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn get_by_id(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.get(post_id))
    }

    async fn apply_vote_delta(
        &self,
        post_id: Uuid,
        upvotes_delta: i64,
        downvotes_delta: i64,
    ) -> StoreResult<Post> {
        // The shard write lock makes the read-add-store a single step per post.
        let mut post = self.posts.get_mut(&post_id).ok_or(StoreError::NotFound)?;

        let upvotes = post.upvotes.checked_add_signed(upvotes_delta);
        let downvotes = post.downvotes.checked_add_signed(downvotes_delta);
        let (Some(upvotes), Some(downvotes)) = (upvotes, downvotes) else {
            return Err(StoreError::NegativeCounter(post_id));
        };

        post.upvotes = upvotes;
        post.downvotes = downvotes;
        Ok(post.clone())
    }
}
