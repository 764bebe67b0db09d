use crate::models::VoteKind;

/// Where a single user stands on a single post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    None,
    Voted(VoteKind),
}

impl From<Option<VoteKind>> for VoteState {
    fn from(kind: Option<VoteKind>) -> Self {
        kind.map_or(VoteState::None, VoteState::Voted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOp {
    Insert,
    Update,
    Delete,
}

/// The effect of one voting intent: the ledger mutation and the counter and
/// author score deltas that go with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: VoteState,
    pub to: VoteState,
    pub upvotes_delta: i64,
    pub downvotes_delta: i64,
    pub score_delta: i64,
}

impl Transition {
    /// Same kind again toggles the vote off, the other kind switches it,
    /// and from `None` it is a fresh vote.
    pub fn plan(current: VoteState, desired: VoteKind) -> Self {
        use VoteKind::{Down, Up};
        use VoteState::{None, Voted};

        let (to, upvotes_delta, downvotes_delta, score_delta) = match (current, desired) {
            (None, Up) => (Voted(Up), 1, 0, 1),
            (None, Down) => (Voted(Down), 0, 1, -1),
            (Voted(Up), Up) => (None, -1, 0, -1),
            (Voted(Down), Down) => (None, 0, -1, 1),
            (Voted(Up), Down) => (Voted(Down), -1, 1, -2),
            (Voted(Down), Up) => (Voted(Up), 1, -1, 2),
        };

        Self {
            from: current,
            to,
            upvotes_delta,
            downvotes_delta,
            score_delta,
        }
    }

    pub fn ledger_op(&self) -> LedgerOp {
        match (self.from, self.to) {
            (VoteState::None, _) => LedgerOp::Insert,
            (_, VoteState::None) => LedgerOp::Delete,
            _ => LedgerOp::Update,
        }
    }
}
