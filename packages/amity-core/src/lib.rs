//! # Amity Core
//!
//! Accounts, the friend-request graph and per-user media for the Amity
//! social backend.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           AMITY CORE                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │  Accounts    │  │   Friends    │  │  Directory   │  │   Media    │  │
//! │  │ signup/login │  │ send/accept/ │  │  username    │  │ upload/    │  │
//! │  │ profile      │  │ decline/recs │  │  search      │  │ search     │  │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘  └─────┬──────┘  │
//! │         │                 │                 │                │         │
//! │         └─────────────────┼─────────────────┘                │         │
//! │                           ▼                                  ▼         │
//! │                ┌─────────────────────┐         ┌─────────────────────┐ │
//! │                │ UserStore (trait)   │         │ ObjectStorage       │ │
//! │                │  └─ Database        │◄────────│  (media bytes)      │ │
//! │                │     (SQLite)        │ metadata└─────────────────────┘ │
//! │                └─────────────────────┘                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`users`] - The user record and its public projections
//! - [`storage`] - `UserStore` trait and the SQLite database
//! - [`friends`] - Friend requests, friendships and recommendations
//! - [`directory`] - Username search
//! - [`auth`] - Password hashing and session tokens
//! - [`accounts`] - Signup, login and profiles
//! - [`media`] - Media uploads and object storage

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod accounts;
pub mod auth;
pub mod directory;
pub mod error;
pub mod friends;
pub mod media;
pub mod storage;
pub mod time;
pub mod users;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use accounts::{AccountService, AuthSession, LoginRequest, ProfileUpdate, SignupRequest};
pub use auth::{Claims, TokenSigner};
pub use directory::Directory;
pub use error::{Error, Result, StoreError};
pub use friends::{FriendsConfig, FriendsService};
pub use media::{MediaKind, MediaQuery, MediaRecord, MediaService, MediaSort, SortOrder};
pub use storage::{Database, UserStore};
pub use users::{AccountView, User, UserSummary};

// ============================================================================
// CORE INSTANCE
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use media::{FsObjectStorage, MemoryObjectStorage, ObjectStorage};

/// Configuration for opening Amity Core
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// SQLite file; in-memory when `None`
    pub database_path: Option<String>,
    /// Root for media bytes; kept in memory when `None`
    pub data_dir: Option<PathBuf>,
    /// Secret the session signing key is derived from
    pub session_secret: String,
    pub token_ttl_secs: i64,
    /// Prefix for generated media URLs
    pub public_base_url: String,
    pub friends: FriendsConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            data_dir: None,
            session_secret: "amity-dev-secret".to_string(),
            token_ttl_secs: auth::DEFAULT_TOKEN_TTL_SECS,
            public_base_url: String::new(),
            friends: FriendsConfig::default(),
        }
    }
}

/// All core services wired to one database.
#[derive(Clone)]
pub struct AmityCore {
    pub database: Database,
    pub accounts: AccountService,
    pub friends: FriendsService,
    pub directory: Directory,
    pub media: MediaService,
}

impl AmityCore {
    /// Open the database and build every service.
    pub async fn open(config: CoreConfig) -> Result<Self> {
        let database = Database::open(config.database_path.as_deref()).await?;
        let store: Arc<dyn UserStore> = Arc::new(database.clone());
        let tokens = Arc::new(TokenSigner::new(&config.session_secret, config.token_ttl_secs));

        let objects: Arc<dyn ObjectStorage> = match &config.data_dir {
            Some(dir) => Arc::new(FsObjectStorage::new(dir)),
            None => Arc::new(MemoryObjectStorage::new()),
        };

        tracing::info!(
            database = config.database_path.as_deref().unwrap_or(":memory:"),
            data_dir = ?config.data_dir,
            "Amity core opened"
        );

        Ok(Self {
            accounts: AccountService::new(store.clone(), tokens),
            friends: FriendsService::with_config(store.clone(), config.friends),
            directory: Directory::new(store),
            media: MediaService::new(database.clone(), objects, config.public_base_url),
            database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let core = AmityCore::open(CoreConfig::default()).await.unwrap();
        let session = core
            .accounts
            .signup(SignupRequest {
                email: Some("a@example.com".into()),
                password: Some("pw".into()),
                username: Some("alice".into()),
            })
            .await
            .unwrap();

        let found = core.directory.search(Some("ali")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, session.account.id);
    }
}
