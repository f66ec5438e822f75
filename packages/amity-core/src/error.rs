//! # Error Handling
//!
//! Error types for Amity Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Validation Errors (100-199)                                       │
//! │  │   ├── Validation            - Missing or malformed input            │
//! │  │   └── InvalidQuery          - Empty/missing search query            │
//! │  │                                                                      │
//! │  ├── Auth Errors (200-299)                                             │
//! │  │   ├── Unauthenticated       - No session token presented            │
//! │  │   ├── InvalidToken          - Bad signature, malformed, expired     │
//! │  │   ├── InvalidCredentials    - Unknown email or wrong password       │
//! │  │   ├── EmailTaken            - Signup with a registered email        │
//! │  │   └── UsernameTaken         - Username owned by another user        │
//! │  │                                                                      │
//! │  ├── Relationship Errors (300-399)                                     │
//! │  │   ├── UserNotFound          - Referenced user id does not exist     │
//! │  │   ├── DuplicateRequest      - Request already pending               │
//! │  │   ├── NoSuchRequest         - Accept/decline target not pending     │
//! │  │   └── CannotAddSelf         - Request addressed to the caller       │
//! │  │                                                                      │
//! │  ├── Storage Errors (400-499)                                          │
//! │  │   ├── Store                 - Persistence failure (StoreError)      │
//! │  │   └── PartialFailure        - First of two writes committed only    │
//! │  │                                                                      │
//! │  └── Media Errors (500-599)                                            │
//! │      ├── MediaNotFound         - Media id does not exist               │
//! │      ├── UnsupportedMedia      - File type outside the allow-list      │
//! │      ├── Forbidden             - Caller does not own the media         │
//! │      └── ObjectStorage         - Blob read/write failed                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error exposes a stable [`Error::kind`] string and a numeric
//! [`Error::code`]; the HTTP layer renders both alongside the message.

use thiserror::Error;

/// Result type alias for Amity Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a [`UserStore`](crate::storage::UserStore) or the
/// media metadata tables.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record changed since it was read (version mismatch)
    #[error("Write conflict on record {0}: it was modified concurrently")]
    Conflict(String),

    /// A unique column already holds this value
    #[error("Duplicate value for unique field `{0}`")]
    Duplicate(&'static str),

    /// The backend is busy or unreachable; retrying may succeed
    #[error("Store temporarily unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("Database error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether a retry of the same write can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    StoreError::Unavailable(err.to_string())
                }
                rusqlite::ErrorCode::ConstraintViolation => {
                    let message = message.as_deref().unwrap_or_default();
                    if message.contains("users.email") {
                        StoreError::Duplicate("email")
                    } else if message.contains("users.username") {
                        StoreError::Duplicate("username")
                    } else {
                        StoreError::Backend(err.to_string())
                    }
                }
                _ => StoreError::Backend(err.to_string()),
            },
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// Main error type for Amity Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation Errors (100-199)
    // ========================================================================

    /// Missing or malformed input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Search query missing or empty
    #[error("Invalid query parameter: {0}")]
    InvalidQuery(String),

    // ========================================================================
    // Auth Errors (200-299)
    // ========================================================================

    /// No session token was presented
    #[error("You are not authenticated.")]
    Unauthenticated,

    /// Session token is malformed, forged or expired
    #[error("Token is not valid: {0}")]
    InvalidToken(String),

    /// Unknown email or wrong password
    #[error("Incorrect email or password.")]
    InvalidCredentials,

    /// Email already registered
    #[error("Email already exists.")]
    EmailTaken,

    /// Username already owned by another user
    #[error("Username already taken.")]
    UsernameTaken,

    // ========================================================================
    // Relationship Errors (300-399)
    // ========================================================================

    /// Referenced user does not exist
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The caller already has a request pending with the target
    #[error("Friend request already sent.")]
    DuplicateRequest,

    /// Accept/decline target has no pending request with the caller
    #[error("No friend request from this user.")]
    NoSuchRequest,

    /// A request addressed to the caller themself
    #[error("Cannot send a friend request to yourself.")]
    CannotAddSelf,

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The first record of a two-record write was committed but the second
    /// could not be, even after retrying
    #[error("Partial write: {committed} was saved but {pending} was not ({source})")]
    PartialFailure {
        /// Id of the record that was persisted
        committed: String,
        /// Id of the record that is missing its update
        pending: String,
        /// Last error seen on the second write
        source: StoreError,
    },

    // ========================================================================
    // Media Errors (500-599)
    // ========================================================================

    /// Media id does not exist
    #[error("Media not found: {0}")]
    MediaNotFound(String),

    /// Uploaded file outside the allowed image/video types
    #[error("Unsupported media: {0}")]
    UnsupportedMedia(String),

    /// Caller may not act on this resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Blob storage read or write failed
    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Numeric error code, grouped by category:
    /// - 100-199: Validation
    /// - 200-299: Auth
    /// - 300-399: Relationships
    /// - 400-499: Storage
    /// - 500-599: Media
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::Validation(_) => 100,
            Error::InvalidQuery(_) => 101,

            Error::Unauthenticated => 200,
            Error::InvalidToken(_) => 201,
            Error::InvalidCredentials => 202,
            Error::EmailTaken => 203,
            Error::UsernameTaken => 204,

            Error::UserNotFound(_) => 300,
            Error::DuplicateRequest => 301,
            Error::NoSuchRequest => 302,
            Error::CannotAddSelf => 303,

            Error::Store(StoreError::Backend(_)) => 400,
            Error::Store(StoreError::Conflict(_)) => 401,
            Error::Store(StoreError::Duplicate(_)) => 402,
            Error::Store(StoreError::Unavailable(_)) => 403,
            Error::PartialFailure { .. } => 410,

            Error::MediaNotFound(_) => 500,
            Error::UnsupportedMedia(_) => 501,
            Error::Forbidden(_) => 502,
            Error::ObjectStorage(_) => 503,

            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::InvalidQuery(_) => "invalid_query",
            Error::Unauthenticated => "unauthenticated",
            Error::InvalidToken(_) => "invalid_token",
            Error::InvalidCredentials => "invalid_credentials",
            Error::EmailTaken => "email_taken",
            Error::UsernameTaken => "username_taken",
            Error::UserNotFound(_) => "not_found",
            Error::DuplicateRequest => "duplicate_request",
            Error::NoSuchRequest => "no_such_request",
            Error::CannotAddSelf => "cannot_add_self",
            Error::Store(StoreError::Conflict(_)) => "conflict",
            Error::Store(_) => "store_error",
            Error::PartialFailure { .. } => "partial_failure",
            Error::MediaNotFound(_) => "media_not_found",
            Error::UnsupportedMedia(_) => "unsupported_media",
            Error::Forbidden(_) => "forbidden",
            Error::ObjectStorage(_) => "object_storage",
            Error::Internal(_) => "internal",
            Error::SerializationError(_) => "serialization",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying the same
    /// call unchanged.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Store(StoreError::Unavailable(_)) | Error::Store(StoreError::Conflict(_))
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(StoreError::from(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::ObjectStorage(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
