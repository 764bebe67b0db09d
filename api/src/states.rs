use crate::{
    config::Config,
    store::{InMemoryPostStore, InMemoryUserStore, InMemoryVoteLedger},
    voting::VoteReconciler,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Stores are shared by `Arc` between the handlers and the reconciler; the
/// reconciler only sees them through its store traits.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<InMemoryUserStore>,
    pub posts: Arc<InMemoryPostStore>,
    pub votes: Arc<InMemoryVoteLedger>,
    pub reconciler: Arc<VoteReconciler>,
    pub vote_limiter: Arc<DefaultKeyedRateLimiter<Uuid>>,
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let posts = Arc::new(InMemoryPostStore::new());
        let votes = Arc::new(InMemoryVoteLedger::new());
        let reconciler = VoteReconciler::new(votes.clone(), posts.clone(), users.clone());

        Self {
            users,
            posts,
            votes,
            reconciler: Arc::new(reconciler),
            vote_limiter: Arc::new(RateLimiter::keyed(Quota::per_second(
                config.vote_rate_per_second,
            ))),
            jwt_secret: config.jwt_secret.clone(),
        }
    }

    /// Drops limiter entries for voters whose quota has fully refilled.
    pub fn prune_vote_limiter(&self) {
        self.vote_limiter.retain_recent();
        self.vote_limiter.shrink_to_fit();
        debug!("Vote limiter pruned, {} voters tracked", self.vote_limiter.len());
    }

    pub fn spawn_vote_limiter_pruning(&self, every: Duration) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                state.prune_vote_limiter();
            }
        })
    }
}
