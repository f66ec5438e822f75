//! # Friends Module
//!
//! The friend-request relationship engine.
//!
//! ## Friend Request Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      FRIEND REQUEST FLOW                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Alice (Sender)                              Bob (Recipient)           │
//! │  ─────────────────────────────────────────────────────────────         │
//! │                                                                         │
//! │  1. send_request(alice, bob)                                           │
//! │     bob.friend_requests += alice   ──────────►  pending                │
//! │                                                                         │
//! │                                              2. User Decision           │
//! │                                              ┌─────────────────────┐   │
//! │                                              │ accept / decline    │   │
//! │                                              └──────────┬──────────┘   │
//! │                                                         │              │
//! │  3a. accept_request(bob, alice)                         │              │
//! │      bob.friend_requests -= alice                       │              │
//! │      bob.friends   += alice   ┐ one save_pair           │              │
//! │      alice.friends += bob     ┘                         │              │
//! │                                                         │              │
//! │  3b. decline_request(bob, alice)                        │              │
//! │      bob.friend_requests -= alice   (alice not told)    │              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Every mutation holds the per-user locks of the records it touches (see
//! [`UserLocks`]) and runs its read-validate-write sequence against a
//! version-checked store. A [`StoreError::Conflict`] means another process
//! wrote first; the sequence is re-run from the read, up to
//! [`FriendsConfig::max_attempts`] times.

mod locks;

pub use locks::{UserLockGuard, UserLocks};

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result, StoreError};
use crate::storage::UserStore;
use crate::users::{User, UserSummary};

/// Tunables for the relationship engine
#[derive(Debug, Clone)]
pub struct FriendsConfig {
    /// Total runs of a mutation before a write conflict is surfaced
    pub max_attempts: u32,
    /// Base delay between runs; grows linearly with the attempt number
    pub conflict_backoff: Duration,
}

impl Default for FriendsConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            conflict_backoff: Duration::from_millis(10),
        }
    }
}

/// Service for managing friend relationships
#[derive(Clone)]
pub struct FriendsService {
    store: Arc<dyn UserStore>,
    locks: Arc<UserLocks>,
    config: FriendsConfig,
}

impl FriendsService {
    /// Create a new friends service
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self::with_config(store, FriendsConfig::default())
    }

    pub fn with_config(store: Arc<dyn UserStore>, config: FriendsConfig) -> Self {
        Self {
            store,
            locks: Arc::new(UserLocks::new()),
            config,
        }
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Record a pending request from `self_id` to `target_id`.
    pub async fn send_request(&self, self_id: &str, target_id: &str) -> Result<()> {
        if self_id == target_id {
            return Err(Error::CannotAddSelf);
        }

        let _guard = self.locks.acquire(&[target_id]).await;
        self.with_retry("send_request", || async move {
            let mut target = self.load(target_id).await?;
            if !target.push_request(self_id) {
                return Err(Error::DuplicateRequest);
            }
            self.store.save(&mut target).await?;
            Ok(())
        })
        .await?;

        tracing::info!(from = self_id, to = target_id, "Friend request sent");
        Ok(())
    }

    /// Accept the pending request from `requester_id`; both users become
    /// friends.
    pub async fn accept_request(&self, self_id: &str, requester_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(&[self_id, requester_id]).await;
        self.with_retry("accept_request", || async move {
            let mut me = self.load(self_id).await?;
            let mut requester = self.load(requester_id).await?;

            if !me.remove_request(requester_id) {
                return Err(Error::NoSuchRequest);
            }
            me.add_friend(requester_id);
            requester.add_friend(self_id);

            self.store.save_pair(&mut me, &mut requester).await
        })
        .await?;

        tracing::info!(user = self_id, requester = requester_id, "Friend request accepted");
        Ok(())
    }

    /// Drop the pending request from `requester_id`. The requester is not
    /// notified.
    pub async fn decline_request(&self, self_id: &str, requester_id: &str) -> Result<()> {
        let _guard = self.locks.acquire(&[self_id]).await;
        self.with_retry("decline_request", || async move {
            let mut me = self.load(self_id).await?;
            if self.store.find_by_id(requester_id).await?.is_none() {
                return Err(Error::UserNotFound(requester_id.to_string()));
            }

            if !me.remove_request(requester_id) {
                return Err(Error::NoSuchRequest);
            }
            self.store.save(&mut me).await?;
            Ok(())
        })
        .await?;

        tracing::info!(user = self_id, requester = requester_id, "Friend request declined");
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Friends of friends, excluding `self_id` and its existing friends.
    ///
    /// Each candidate appears once, in first-reached order.
    pub async fn recommendations(&self, self_id: &str) -> Result<Vec<UserSummary>> {
        let me = self.load(self_id).await?;
        let friends = self.store.find_many(&me.friends).await?;

        let mut seen: HashSet<&str> = me.friends.iter().map(String::as_str).collect();
        seen.insert(self_id);

        let mut candidates = Vec::new();
        for friend in &friends {
            for id in &friend.friends {
                if seen.insert(id.as_str()) {
                    candidates.push(id.clone());
                }
            }
        }

        tracing::debug!(user = self_id, count = candidates.len(), "Recommendations computed");
        self.summaries(&candidates).await
    }

    /// Users with a request pending to `self_id`.
    pub async fn incoming_requests(&self, self_id: &str) -> Result<Vec<UserSummary>> {
        let me = self.load(self_id).await?;
        self.summaries(&me.friend_requests).await
    }

    /// Accepted friends of `self_id`.
    pub async fn list_friends(&self, self_id: &str) -> Result<Vec<UserSummary>> {
        let me = self.load(self_id).await?;
        self.summaries(&me.friends).await
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    async fn load(&self, id: &str) -> Result<User> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    async fn summaries(&self, ids: &[String]) -> Result<Vec<UserSummary>> {
        let users = self.store.find_many(ids).await?;
        Ok(users.iter().map(User::summary).collect())
    }

    /// Run `attempt` until it does not fail with a write conflict.
    async fn with_retry<F, Fut>(&self, op: &'static str, mut attempt: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut run = 1;
        loop {
            match attempt().await {
                Err(Error::Store(StoreError::Conflict(record))) if run < self.config.max_attempts => {
                    tracing::debug!(op, run, record = record.as_str(), "Write conflict, re-running");
                    tokio::time::sleep(self.config.conflict_backoff * run).await;
                    run += 1;
                }
                Err(e @ Error::Store(StoreError::Conflict(_))) => {
                    tracing::warn!(op, runs = run, error = %e, "Giving up after repeated conflicts");
                    return Err(e);
                }
                other => return other,
            }
        }
    }
}
