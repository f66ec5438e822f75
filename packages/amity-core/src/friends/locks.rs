//! Per-user async locks.
//!
//! Operations that read-modify-write user records hold the lock of every
//! record they touch for the whole sequence. Locks are taken in sorted id
//! order, so two operations over the same pair always queue instead of
//! deadlocking. An id's entry is dropped once nobody holds or waits on it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// Registry of one async mutex per user id.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Arc<LockMap>,
}

/// Held locks; released on drop.
#[derive(Debug)]
pub struct UserLockGuard {
    locks: Arc<LockMap>,
    guards: Vec<(String, OwnedMutexGuard<()>)>,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        for (id, guard) in self.guards.drain(..) {
            drop(guard);
            // Waiters hold a clone, so the map's Arc is unique only when idle.
            self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every id in `ids` (duplicates allowed) in sorted order.
    pub async fn acquire(&self, ids: &[&str]) -> UserLockGuard {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            // Clone the Arc out so no map shard is held across the await.
            let lock = self.locks.entry(id.to_string()).or_default().clone();
            guards.push((id.to_string(), lock.lock_owned().await));
        }

        UserLockGuard {
            locks: self.locks.clone(),
            guards,
        }
    }

    /// Number of ids currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
