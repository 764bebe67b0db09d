use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type PairKey = (Uuid, Uuid);

/// One async mutex per `(post_id, user_id)` that currently has a writer.
/// Entries are dropped again once nobody holds or waits on them.
#[derive(Default)]
pub struct PairLocks {
    inflight: Arc<DashMap<PairKey, Arc<Mutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, post_id: Uuid, user_id: Uuid) -> PairGuard {
        let key = (post_id, user_id);
        let lock = Arc::clone(
            self.inflight
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        PairGuard {
            inflight: Arc::clone(&self.inflight),
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inflight.len()
    }
}

pub struct PairGuard {
    inflight: Arc<DashMap<PairKey, Arc<Mutex<()>>>>,
    key: PairKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        // Release first so the map holds the last reference if nobody waits.
        self.guard.take();
        self.inflight
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
