use crate::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("post not found")]
    PostNotFound,

    #[error("invalid vote kind: {0:?}")]
    InvalidVoteKind(String),

    /// Lost an insert race on the `(post, user)` pair.
    #[error("vote already recorded for this user and post")]
    DuplicateVote,

    /// The vote kept changing underneath this request; safe to retry.
    #[error("vote changed concurrently, please retry")]
    Conflict,

    /// Never returned to callers; built only to be logged.
    #[error("failed to apply score delta {delta} to author {author_id}: {source}")]
    ScoreUpdateFailed {
        author_id: Uuid,
        delta: i64,
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type VoteResult<T> = Result<T, VoteError>;
