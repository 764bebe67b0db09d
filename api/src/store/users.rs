use super::{StoreError, StoreResult, UserStore};
use crate::models::User;
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<Uuid, User>,
    email_index: DashMap<String, Uuid>,
    username_index: DashMap<String, Uuid>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user; email and username are unique (case-insensitive).
    pub fn create(&self, user: User) -> StoreResult<User> {
        let email = user.email.to_lowercase();
        let username = user.username.to_lowercase();

        match self.email_index.entry(email.clone()) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists("email")),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        match self.username_index.entry(username) {
            Entry::Occupied(_) => {
                self.email_index.remove(&email);
                return Err(StoreError::AlreadyExists("username"));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn get(&self, user_id: Uuid) -> Option<User> {
        self.users.get(&user_id).map(|u| u.clone())
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let user_id = *self.email_index.get(&email.to_lowercase())?;
        self.get(user_id)
    }

    pub fn update_profile(
        &self,
        user_id: Uuid,
        username: Option<String>,
        bio: Option<String>,
        profile_image: Option<String>,
    ) -> StoreResult<User> {
        // Renames of the same user serialize on this entry.
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;

        if let Some(new_name) = &username {
            let old_key = user.username.to_lowercase();
            let new_key = new_name.to_lowercase();
            if new_key != old_key {
                match self.username_index.entry(new_key) {
                    Entry::Occupied(_) => return Err(StoreError::AlreadyExists("username")),
                    Entry::Vacant(slot) => {
                        slot.insert(user_id);
                    }
                }
                self.username_index.remove(&old_key);
            }
        }

        if let Some(username) = username {
            user.username = username;
        }
        if bio.is_some() {
            user.bio = bio;
        }
        if profile_image.is_some() {
            user.profile_image = profile_image;
        }
        Ok(user.clone())
    }

    #[cfg(test)]
    fn names_held_by(&self, user_id: Uuid) -> usize {
        self.username_index.iter().filter(|e| *e.value() == user_id).count()
    }

    pub fn adjust_post_count(&self, user_id: Uuid, delta: i64) -> StoreResult<()> {
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.total_posts = user.total_posts.saturating_add_signed(delta);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn apply_score_delta(&self, user_id: Uuid, delta: i64) -> StoreResult<()> {
        let mut user = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.taste_score += delta;
        Ok(())
    }
}
