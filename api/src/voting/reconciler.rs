use super::{
    VoteError, VoteResult,
    pair_lock::PairLocks,
    transition::{Transition, VoteState},
};
use crate::{
    models::{Post, VoteKind, VoteRecord},
    store::{PostStore, StoreError, UserStore, VoteLedger},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Post counters after a vote, plus where the voter now stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub upvotes: u64,
    pub downvotes: u64,
    pub user_vote: Option<VoteKind>,
}

/// What a ledger write changed, kept so it can be undone.
#[derive(Debug)]
enum LedgerWrite {
    Inserted(VoteRecord),
    Updated { before: VoteRecord },
    Deleted(VoteRecord),
}

struct Applied {
    /// `None` when the call converged on a concurrent request's result.
    transition: Option<Transition>,
    post: Post,
    state: VoteState,
}

impl Applied {
    fn outcome(&self) -> VoteOutcome {
        VoteOutcome {
            upvotes: self.post.upvotes,
            downvotes: self.post.downvotes,
            user_vote: match self.state {
                VoteState::None => None,
                VoteState::Voted(kind) => Some(kind),
            },
        }
    }
}

/// Turns voting intents into ledger writes, post counter deltas and
/// author taste score deltas.
///
/// The ledger write and the counter delta for one `(post, user)` pair run
/// under that pair's lock and are undone together on failure. The score
/// delta runs afterwards and is best-effort.
pub struct VoteReconciler {
    ledger: Arc<dyn VoteLedger>,
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserStore>,
    locks: PairLocks,
}

impl VoteReconciler {
    pub fn new(
        ledger: Arc<dyn VoteLedger>,
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            ledger,
            posts,
            users,
            locks: PairLocks::new(),
        }
    }

    pub async fn cast_vote(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: VoteKind,
    ) -> VoteResult<VoteOutcome> {
        let post = self
            .posts
            .get_by_id(post_id)
            .await?
            .ok_or(VoteError::PostNotFound)?;

        let existing = self.ledger.find(user_id, post_id).await?;
        let transition = Transition::plan(state_of(existing.as_ref()), kind);

        let applied = match self.apply(user_id, post_id, existing, transition).await {
            Err(err @ (VoteError::DuplicateVote | VoteError::Conflict)) => {
                debug!("Lost vote race on post {} for user {}: {}", post_id, user_id, err);
                self.retry(user_id, post_id, kind, transition.to).await?
            }
            result => result?,
        };

        if let Some(transition) = applied.transition {
            self.apply_score(post.user_id, transition.score_delta).await;
        }

        let outcome = applied.outcome();
        info!(
            "Vote {} on post {} by user {}: {}/{}",
            kind, post_id, user_id, outcome.upvotes, outcome.downvotes
        );
        Ok(outcome)
    }

    /// Removes a deleted post's net votes from its author's score.
    pub async fn withdraw_post(&self, post: &Post) {
        let net = post.net_votes();
        if net != 0 {
            self.apply_score(post.user_id, -net).await;
        }
    }

    /// Second and last attempt after the ledger moved between our read and
    /// our write.
    async fn retry(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        kind: VoteKind,
        target: VoteState,
    ) -> VoteResult<Applied> {
        let current = self.ledger.find(user_id, post_id).await?;
        let state = state_of(current.as_ref());

        if state == target {
            // The concurrent writer already put the vote where this one was going.
            let post = self
                .posts
                .get_by_id(post_id)
                .await?
                .ok_or(VoteError::PostNotFound)?;
            return Ok(Applied {
                transition: None,
                post,
                state,
            });
        }

        let transition = Transition::plan(state, kind);
        match self.apply(user_id, post_id, current, transition).await {
            Err(VoteError::DuplicateVote | VoteError::Conflict) => {
                warn!("Vote on post {} by user {} lost the race twice", post_id, user_id);
                Err(VoteError::Conflict)
            }
            result => result,
        }
    }

    /// Steps 4 and 5: ledger write, then counters, as one unit.
    async fn apply(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        existing: Option<VoteRecord>,
        transition: Transition,
    ) -> VoteResult<Applied> {
        let _pair = self.locks.acquire(post_id, user_id).await;

        debug!(
            "{:?} vote for user {} on post {}: {:?} -> {:?}",
            transition.ledger_op(),
            user_id,
            post_id,
            transition.from,
            transition.to
        );
        let written = self.write_ledger(user_id, post_id, existing, transition).await?;

        let counters = self
            .posts
            .apply_vote_delta(post_id, transition.upvotes_delta, transition.downvotes_delta)
            .await;

        match counters {
            Ok(post) => Ok(Applied {
                transition: Some(transition),
                post,
                state: transition.to,
            }),
            Err(err) => {
                self.undo(written).await;
                Err(match err {
                    StoreError::NotFound => VoteError::PostNotFound,
                    StoreError::NegativeCounter(id) => {
                        error!("Vote counters of post {} would go negative", id);
                        VoteError::Store(err)
                    }
                    other => other.into(),
                })
            }
        }
    }

    async fn write_ledger(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        existing: Option<VoteRecord>,
        transition: Transition,
    ) -> VoteResult<LedgerWrite> {
        let result = match (existing, transition.to) {
            (None, VoteState::Voted(kind)) => {
                let record = VoteRecord::new(user_id, post_id, kind);
                self.ledger
                    .insert(record.clone())
                    .await
                    .map(|()| LedgerWrite::Inserted(record))
            }
            (Some(before), VoteState::Voted(kind)) => self
                .ledger
                .update(&before.switched_to(kind))
                .await
                .map(|()| LedgerWrite::Updated { before }),
            (Some(record), VoteState::None) => self
                .ledger
                .delete(record.id, record.kind)
                .await
                .map(|()| LedgerWrite::Deleted(record)),
            (None, VoteState::None) => unreachable!("a fresh vote always lands in a voted state"),
        };

        result.map_err(|err| match err {
            StoreError::DuplicateVote => VoteError::DuplicateVote,
            StoreError::NotFound => VoteError::Conflict,
            other => other.into(),
        })
    }

    async fn undo(&self, written: LedgerWrite) {
        let result = match &written {
            LedgerWrite::Inserted(record) => self.ledger.delete(record.id, record.kind).await,
            LedgerWrite::Updated { before } => self.ledger.update(before).await,
            LedgerWrite::Deleted(record) => self.ledger.insert(record.clone()).await,
        };

        if let Err(err) = result {
            error!("Failed to roll back ledger write {:?}: {}", written, err);
        }
    }

    async fn apply_score(&self, author_id: Uuid, delta: i64) {
        if let Err(source) = self.users.apply_score_delta(author_id, delta).await {
            let err = VoteError::ScoreUpdateFailed {
                author_id,
                delta,
                source,
            };
            warn!("Taste score left behind: {}", err);
        }
    }
}

fn state_of(record: Option<&VoteRecord>) -> VoteState {
    record.map(|r| r.kind).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::User,
        store::{InMemoryPostStore, InMemoryUserStore, InMemoryVoteLedger, StoreResult},
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use crate::models::VoteKind::{Down, Up};

    struct Fixture {
        ledger: Arc<InMemoryVoteLedger>,
        posts: Arc<InMemoryPostStore>,
        users: Arc<InMemoryUserStore>,
        author: Uuid,
        post: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            let users = Arc::new(InMemoryUserStore::new());
            let author = users
                .create(User {
                    id: Uuid::new_v4(),
                    email: "author@example.com".into(),
                    username: "author".into(),
                    hashed_password: String::new(),
                    bio: None,
                    profile_image: None,
                    taste_score: 0,
                    total_posts: 1,
                    created_at: 0,
                })
                .unwrap();

            let posts = Arc::new(InMemoryPostStore::new());
            let post = Post::new(author.id, "Pilsner in Tartu".into(), "aW1n".into(), Some("Tartu".into()));
            let post_id = post.id;
            posts.insert(post);

            Self {
                ledger: Arc::new(InMemoryVoteLedger::new()),
                posts,
                users,
                author: author.id,
                post: post_id,
            }
        }

        fn reconciler(&self) -> VoteReconciler {
            VoteReconciler::new(self.ledger.clone(), self.posts.clone(), self.users.clone())
        }

        fn counters(&self) -> (u64, u64) {
            let post = self.posts.get(self.post).unwrap();
            (post.upvotes, post.downvotes)
        }

        fn score(&self) -> i64 {
            self.users.get(self.author).unwrap().taste_score
        }
    }

    #[tokio::test]
    async fn two_voters_and_a_switch() {
        let fx = Fixture::new();
        let reconciler = fx.reconciler();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let out = reconciler.cast_vote(a, fx.post, Up).await.unwrap();
        assert_eq!((out.upvotes, out.downvotes), (1, 0));
        assert_eq!(fx.score(), 1);

        let out = reconciler.cast_vote(b, fx.post, Down).await.unwrap();
        assert_eq!((out.upvotes, out.downvotes), (1, 1));
        assert_eq!(fx.score(), 0);

        let out = reconciler.cast_vote(a, fx.post, Down).await.unwrap();
        assert_eq!((out.upvotes, out.downvotes), (0, 2));
        assert_eq!(out.user_vote, Some(Down));
        assert_eq!(fx.score(), -2);
    }

    #[tokio::test]
    async fn missing_post_touches_nothing() {
        let fx = Fixture::new();
        let voter = Uuid::new_v4();
        let missing = Uuid::new_v4();

        let err = fx.reconciler().cast_vote(voter, missing, Up).await.unwrap_err();

        assert_eq!(err, VoteError::PostNotFound);
        assert!(fx.ledger.find(voter, missing).await.unwrap().is_none());
        assert_eq!(fx.counters(), (0, 0));
        assert_eq!(fx.score(), 0);
    }

    #[tokio::test]
    async fn repeating_a_vote_removes_it() {
        let fx = Fixture::new();
        let reconciler = fx.reconciler();
        let voter = Uuid::new_v4();

        reconciler.cast_vote(voter, fx.post, Up).await.unwrap();
        let out = reconciler.cast_vote(voter, fx.post, Up).await.unwrap();

        assert_eq!(out.user_vote, None);
        assert_eq!(fx.counters(), (0, 0));
        assert!(fx.ledger.find(voter, fx.post).await.unwrap().is_none());
        assert_eq!(fx.score(), 0);
    }

    #[tokio::test]
    async fn up_down_up_ends_up_voted() {
        let fx = Fixture::new();
        let reconciler = fx.reconciler();
        let voter = Uuid::new_v4();

        for kind in [Up, Down, Up] {
            reconciler.cast_vote(voter, fx.post, kind).await.unwrap();
        }

        assert_eq!(fx.counters(), (1, 0));
        assert_eq!(fx.ledger.kind_for(voter, fx.post), Some(Up));
        assert_eq!(fx.score(), 1);
    }

    #[tokio::test]
    async fn counters_follow_the_table_for_every_sequence() {
        for mask in 0u32..32 {
            let fx = Fixture::new();
            let reconciler = fx.reconciler();
            let voter = Uuid::new_v4();

            let votes: Vec<VoteKind> = (0..5)
                .map(|bit| if mask & (1 << bit) == 0 { Up } else { Down })
                .collect();

            let mut state = VoteState::None;
            let (mut up, mut down) = (0i64, 0i64);
            for kind in &votes {
                let t = Transition::plan(state, *kind);
                state = t.to;
                up += t.upvotes_delta;
                down += t.downvotes_delta;
                reconciler.cast_vote(voter, fx.post, *kind).await.unwrap();
            }

            assert_eq!(fx.counters(), (up as u64, down as u64), "sequence {votes:?}");
            assert_eq!(fx.score(), up - down, "sequence {votes:?}");
        }
    }

    #[tokio::test]
    async fn self_votes_count_toward_own_score() {
        let fx = Fixture::new();
        fx.reconciler().cast_vote(fx.author, fx.post, Up).await.unwrap();
        assert_eq!(fx.score(), 1);
    }

    struct BrokenUsers;

    #[async_trait]
    impl UserStore for BrokenUsers {
        async fn apply_score_delta(&self, _user_id: Uuid, _delta: i64) -> StoreResult<()> {
            Err(StoreError::Unavailable("users offline".into()))
        }
    }

    #[tokio::test]
    async fn score_failure_does_not_fail_the_vote() {
        let fx = Fixture::new();
        let reconciler = VoteReconciler::new(fx.ledger.clone(), fx.posts.clone(), Arc::new(BrokenUsers));
        let voter = Uuid::new_v4();

        let out = reconciler.cast_vote(voter, fx.post, Down).await.unwrap();

        assert_eq!((out.upvotes, out.downvotes), (0, 1));
        assert_eq!(fx.ledger.kind_for(voter, fx.post), Some(Down));
        assert_eq!(fx.score(), 0);
    }

    /// Counters that can be read but never written.
    struct FrozenPosts(Arc<InMemoryPostStore>);

    #[async_trait]
    impl PostStore for FrozenPosts {
        async fn get_by_id(&self, post_id: Uuid) -> StoreResult<Option<Post>> {
            self.0.get_by_id(post_id).await
        }

        async fn apply_vote_delta(&self, _: Uuid, _: i64, _: i64) -> StoreResult<Post> {
            Err(StoreError::Unavailable("posts read-only".into()))
        }
    }

    #[tokio::test]
    async fn counter_failure_rolls_back_the_ledger() {
        let fx = Fixture::new();
        let voter = Uuid::new_v4();
        fx.reconciler().cast_vote(voter, fx.post, Up).await.unwrap();

        let frozen = VoteReconciler::new(
            fx.ledger.clone(),
            Arc::new(FrozenPosts(fx.posts.clone())),
            fx.users.clone(),
        );

        // Switch, toggle-off and fresh vote all leave the ledger as it was.
        let err = frozen.cast_vote(voter, fx.post, Down).await.unwrap_err();
        assert!(matches!(err, VoteError::Store(StoreError::Unavailable(_))));
        assert_eq!(fx.ledger.kind_for(voter, fx.post), Some(Up));

        frozen.cast_vote(voter, fx.post, Up).await.unwrap_err();
        assert_eq!(fx.ledger.kind_for(voter, fx.post), Some(Up));

        let newcomer = Uuid::new_v4();
        frozen.cast_vote(newcomer, fx.post, Down).await.unwrap_err();
        assert_eq!(fx.ledger.kind_for(newcomer, fx.post), None);

        assert_eq!(fx.counters(), (1, 0));
        assert_eq!(fx.score(), 1);
    }

    /// Lets a competing request for the same voter land right after the
    /// first ledger read.
    struct RacingLedger {
        inner: Arc<InMemoryVoteLedger>,
        rival: VoteKind,
        posts: Arc<InMemoryPostStore>,
        users: Arc<InMemoryUserStore>,
        fired: AtomicBool,
    }

    #[async_trait]
    impl VoteLedger for RacingLedger {
        async fn find(&self, user_id: Uuid, post_id: Uuid) -> StoreResult<Option<VoteRecord>> {
            let seen = self.inner.find(user_id, post_id).await?;
            if !self.fired.swap(true, Ordering::SeqCst) {
                let rival = VoteReconciler::new(self.inner.clone(), self.posts.clone(), self.users.clone());
                rival
                    .cast_vote(user_id, post_id, self.rival)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
            Ok(seen)
        }

        async fn insert(&self, record: VoteRecord) -> StoreResult<()> {
            self.inner.insert(record).await
        }

        async fn update(&self, record: &VoteRecord) -> StoreResult<()> {
            self.inner.update(record).await
        }

        async fn delete(&self, record_id: Uuid, kind: VoteKind) -> StoreResult<()> {
            self.inner.delete(record_id, kind).await
        }
    }

    fn racing(fx: &Fixture, rival: VoteKind) -> VoteReconciler {
        let ledger = RacingLedger {
            inner: fx.ledger.clone(),
            rival,
            posts: fx.posts.clone(),
            users: fx.users.clone(),
            fired: AtomicBool::new(false),
        };
        VoteReconciler::new(Arc::new(ledger), fx.posts.clone(), fx.users.clone())
    }

    #[tokio::test]
    async fn racing_first_votes_record_once() {
        let fx = Fixture::new();
        let voter = Uuid::new_v4();

        let out = racing(&fx, Up).cast_vote(voter, fx.post, Up).await.unwrap();

        assert_eq!((out.upvotes, out.downvotes), (1, 0));
        assert_eq!(out.user_vote, Some(Up));
        assert_eq!(fx.ledger.count_for_post(fx.post), 1);
        assert_eq!(fx.score(), 1);
    }

    #[tokio::test]
    async fn racing_opposite_first_vote_becomes_a_switch() {
        let fx = Fixture::new();
        let voter = Uuid::new_v4();

        let out = racing(&fx, Down).cast_vote(voter, fx.post, Up).await.unwrap();

        assert_eq!((out.upvotes, out.downvotes), (1, 0));
        assert_eq!(fx.ledger.kind_for(voter, fx.post), Some(Up));
        assert_eq!(fx.ledger.count_for_post(fx.post), 1);
        assert_eq!(fx.score(), 1);
    }

    #[tokio::test]
    async fn racing_toggle_offs_remove_once() {
        let fx = Fixture::new();
        let voter = Uuid::new_v4();
        fx.reconciler().cast_vote(voter, fx.post, Down).await.unwrap();

        // The rival's DOWN already toggled it off; ours converges.
        let out = racing(&fx, Down).cast_vote(voter, fx.post, Down).await.unwrap();

        assert_eq!((out.upvotes, out.downvotes), (0, 0));
        assert_eq!(out.user_vote, None);
        assert_eq!(fx.score(), 0);
    }

    /// Always claims the pair is free, then refuses the insert.
    struct HauntedLedger;

    #[async_trait]
    impl VoteLedger for HauntedLedger {
        async fn find(&self, _: Uuid, _: Uuid) -> StoreResult<Option<VoteRecord>> {
            Ok(None)
        }

        async fn insert(&self, _: VoteRecord) -> StoreResult<()> {
            Err(StoreError::DuplicateVote)
        }

        async fn update(&self, _: &VoteRecord) -> StoreResult<()> {
            Err(StoreError::NotFound)
        }

        async fn delete(&self, _: Uuid, _: VoteKind) -> StoreResult<()> {
            Err(StoreError::NotFound)
        }
    }

    #[tokio::test]
    async fn second_lost_race_is_a_conflict() {
        let fx = Fixture::new();
        let reconciler = VoteReconciler::new(Arc::new(HauntedLedger), fx.posts.clone(), fx.users.clone());

        let err = reconciler.cast_vote(Uuid::new_v4(), fx.post, Up).await.unwrap_err();

        assert_eq!(err, VoteError::Conflict);
        assert_eq!(fx.counters(), (0, 0));
        assert_eq!(fx.score(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_voters_on_one_post() {
        let fx = Fixture::new();
        let reconciler = Arc::new(fx.reconciler());

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let reconciler = reconciler.clone();
                let post = fx.post;
                let kind = if i % 4 == 0 { Down } else { Up };
                tokio::spawn(async move { reconciler.cast_vote(Uuid::new_v4(), post, kind).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fx.counters(), (48, 16));
        assert_eq!(fx.ledger.count_for_post(fx.post), 64);
        assert_eq!(fx.score(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_voter_hammering_stays_consistent() {
        let fx = Fixture::new();
        let reconciler = Arc::new(fx.reconciler());
        let voter = Uuid::new_v4();

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let reconciler = reconciler.clone();
                let post = fx.post;
                let kind = if i % 3 == 0 { Down } else { Up };
                tokio::spawn(async move { reconciler.cast_vote(voter, post, kind).await })
            })
            .collect();

        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) | Err(VoteError::Conflict) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let expected = match fx.ledger.kind_for(voter, fx.post) {
            None => (0, 0),
            Some(Up) => (1, 0),
            Some(Down) => (0, 1),
        };
        assert_eq!(fx.counters(), expected);
        assert_eq!(fx.score(), expected.0 as i64 - expected.1 as i64);
    }
}
