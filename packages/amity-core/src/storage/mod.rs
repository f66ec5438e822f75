//! # Storage Module
//!
//! Persistence for user records and media metadata.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  FriendsService / Directory / AccountService                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  UserStore (trait)                                              │   │
//! │  │  find_by_id / find_by_name / find_many / insert / save /        │   │
//! │  │  save_pair                                                      │   │
//! │  └───────────────────────────────┬─────────────────────────────────┘   │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Database (SQLite)                                              │   │
//! │  │  • users            - identity, profile, version               │   │
//! │  │  • friendships      - adjacency list (user → friend)           │   │
//! │  │  • friend_requests  - adjacency list (recipient → requester)   │   │
//! │  │  • media            - media metadata (blobs in ObjectStorage)  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Semantics
//!
//! `save` is a compare-and-swap on `User::version`: a record read before a
//! concurrent writer committed fails with [`StoreError::Conflict`] instead of
//! silently overwriting the other write.
//!
//! `save_pair` persists two related records. The SQLite store does this in
//! one transaction. Stores that cannot fall back to
//! [`save_pair_sequential`], which retries a transiently failing second
//! write and reports [`Error::PartialFailure`] when it cannot complete.

mod database;
mod schema;

pub use database::Database;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result, StoreError};
use crate::users::User;

/// Result alias for repository calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Attempts made for the second half of a sequential pair write.
pub const SECOND_WRITE_ATTEMPTS: u32 = 3;

/// Base delay between second-write attempts; grows linearly.
pub const SECOND_WRITE_BACKOFF: Duration = Duration::from_millis(25);

/// Repository contract for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by id.
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    /// Look up a user by (lowercased) email.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Look up a user by exact username.
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Users whose username contains `pattern`, ignoring case. The pattern
    /// is matched literally.
    async fn find_by_name(&self, pattern: &str) -> StoreResult<Vec<User>>;

    /// Users for the given ids, in input order. Unknown ids are skipped.
    async fn find_many(&self, ids: &[String]) -> StoreResult<Vec<User>>;

    /// Create a new record. Fails with [`StoreError::Duplicate`] on a taken
    /// email or username.
    async fn insert(&self, user: &mut User) -> StoreResult<()>;

    /// Persist `user` if nobody else wrote it since it was read. Bumps
    /// `user.version` on success.
    async fn save(&self, user: &mut User) -> StoreResult<()>;

    /// Persist two related records.
    async fn save_pair(&self, first: &mut User, second: &mut User) -> Result<()> {
        save_pair_sequential(self, first, second).await
    }
}

/// Two-step pair write for stores without multi-record transactions.
///
/// The first write is not retried: if it fails nothing has changed and the
/// error is returned as a clean [`Error::Store`]. Once it has committed, the
/// second write is retried on transient errors up to
/// [`SECOND_WRITE_ATTEMPTS`] times before [`Error::PartialFailure`].
pub async fn save_pair_sequential<S>(store: &S, first: &mut User, second: &mut User) -> Result<()>
where
    S: UserStore + ?Sized,
{
    store.save(first).await?;

    let mut attempt = 1;
    loop {
        match store.save(second).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < SECOND_WRITE_ATTEMPTS => {
                tracing::warn!(
                    committed = first.id.as_str(),
                    pending = second.id.as_str(),
                    attempt,
                    error = %e,
                    "Second write of pair failed, retrying"
                );
                tokio::time::sleep(SECOND_WRITE_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    committed = first.id.as_str(),
                    pending = second.id.as_str(),
                    attempts = attempt,
                    error = %e,
                    "Pair write left records inconsistent"
                );
                return Err(Error::PartialFailure {
                    committed: first.id.clone(),
                    pending: second.id.clone(),
                    source: e,
                });
            }
        }
    }
}
