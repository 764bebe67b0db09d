use crate::voting::VoteError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteKind {
    #[serde(rename = "UPVOTE")]
    Up,
    #[serde(rename = "DOWNVOTE")]
    Down,
}

impl VoteKind {
    pub fn opposite(self) -> Self {
        match self {
            VoteKind::Up => VoteKind::Down,
            VoteKind::Down => VoteKind::Up,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteKind::Up => "UPVOTE",
            VoteKind::Down => "DOWNVOTE",
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `UPVOTE`/`UP` and `DOWNVOTE`/`DOWN`, case-insensitively.
impl FromStr for VoteKind {
    type Err = VoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPVOTE" | "UP" => Ok(VoteKind::Up),
            "DOWNVOTE" | "DOWN" => Ok(VoteKind::Down),
            _ => Err(VoteError::InvalidVoteKind(s.to_string())),
        }
    }
}

/// One user's vote on one post. At most one exists per `(post_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub kind: VoteKind,
    pub created_at: i64,
    pub updated_at: i64,
}

impl VoteRecord {
    pub fn new(user_id: Uuid, post_id: Uuid, kind: VoteKind) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4(),
            post_id,
            user_id,
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    /// The same record switched to `kind`.
    pub fn switched_to(&self, kind: VoteKind) -> Self {
        Self {
            kind,
            updated_at: chrono::Utc::now().timestamp_millis(),
            ..self.clone()
        }
    }
}
