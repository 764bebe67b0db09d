use super::{StoreError, StoreResult, VoteLedger};
use crate::models::{VoteKind, VoteRecord};
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

/// `(post_id, user_id)`
type VoteKey = (Uuid, Uuid);

/// Vote records keyed by `(post_id, user_id)`. The map key is the uniqueness
/// constraint: a second insert for the same pair is rejected, never merged.
#[derive(Default)]
pub struct InMemoryVoteLedger {
    records: DashMap<VoteKey, VoteRecord>,
    ids: DashMap<Uuid, VoteKey>,
}

impl InMemoryVoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The viewer's current vote on a post, for rendering feeds.
    pub fn kind_for(&self, user_id: Uuid, post_id: Uuid) -> Option<VoteKind> {
        self.records.get(&(post_id, user_id)).map(|r| r.kind)
    }

    #[cfg(test)]
    pub fn count_for_post(&self, post_id: Uuid) -> usize {
        self.records.iter().filter(|r| r.key().0 == post_id).count()
    }

    /// Cascade for a deleted post. Returns how many records were dropped.
    pub fn remove_for_post(&self, post_id: Uuid) -> usize {
        let before = self.records.len();
        self.records.retain(|(post, _), _| *post != post_id);
        self.ids.retain(|_, (post, _)| *post != post_id);
        before.saturating_sub(self.records.len())
    }

    fn key_of(&self, record_id: Uuid) -> StoreResult<VoteKey> {
        self.ids
            .get(&record_id)
            .map(|k| *k)
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl VoteLedger for InMemoryVoteLedger {
    async fn find(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<VoteRecord>> {
        Ok(self.records.get(&(post_id, user_id)).map(|r| r.clone()))
    }

    async fn insert(&self, record: VoteRecord) -> StoreResult<()> {
        let key = (record.post_id, record.user_id);
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(StoreError::DuplicateVote),
            Entry::Vacant(slot) => {
                self.ids.insert(record.id, key);
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn update(&self, record: &VoteRecord) -> StoreResult<()> {
        let key = self.key_of(record.id)?;
        let mut stored = self.records.get_mut(&key).ok_or(StoreError::NotFound)?;

        if stored.id != record.id || stored.kind != record.kind.opposite() {
            return Err(StoreError::NotFound);
        }

        stored.kind = record.kind;
        stored.updated_at = record.updated_at;
        Ok(())
    }

    async fn delete(&self, record_id: Uuid, kind: VoteKind) -> StoreResult<()> {
        let key = self.key_of(record_id)?;
        self.records
            .remove_if(&key, |_, stored| stored.id == record_id && stored.kind == kind)
            .ok_or(StoreError::NotFound)?;
        self.ids.remove(&record_id);
        Ok(())
    }
}
