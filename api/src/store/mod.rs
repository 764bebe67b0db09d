//! Persistence collaborators of the vote reconciler.
//!
//! The traits describe the minimal contracts the reconciler relies on; the
//! in-memory `DashMap` implementations back the running service.

mod ledger;
mod posts;
mod users;

pub use ledger::InMemoryVoteLedger;
pub use posts::InMemoryPostStore;
pub use users::InMemoryUserStore;

use crate::models::{Post, VoteKind, VoteRecord};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("a vote already exists for this user and post")]
    DuplicateVote,

    #[error("record not found")]
    NotFound,

    #[error("{0} already taken")]
    AlreadyExists(&'static str),

    #[error("counters of post {0} would become negative")]
    NegativeCounter(Uuid),

    /// Backend failure; the in-memory stores never produce it.
    #[allow(dead_code)]
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One vote per `(user, post)` pair.
#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Exact lookup; absence is not an error.
    async fn find(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<VoteRecord>>;

    /// Fails with `DuplicateVote` if the pair already has a record.
    async fn insert(&self, record: VoteRecord) -> StoreResult<()>;

    /// Stores `record.kind` on the record with `record.id`.
    /// Fails with `NotFound` if that record is gone or no longer holds the
    /// opposite kind.
    async fn update(&self, record: &VoteRecord) -> StoreResult<()>;

    /// Removes the record with `record_id` if it still holds `kind`.
    /// Fails with `NotFound` otherwise.
    async fn delete(&self, record_id: Uuid, kind: VoteKind) -> StoreResult<()>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_by_id(&self, post_id: Uuid) -> StoreResult<Option<Post>>;

    /// Adds the deltas to the stored counters in one step and returns the
    /// updated post. Nothing changes if either counter would drop below zero.
    async fn apply_vote_delta(
        &self,
        post_id: Uuid,
        upvotes_delta: i64,
        downvotes_delta: i64,
    ) -> StoreResult<Post>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn apply_score_delta(&self, user_id: Uuid, delta: i64) -> StoreResult<()>;
}
