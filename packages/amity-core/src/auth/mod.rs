//! # Auth Module
//!
//! Credentials and sessions.
//!
//! - [`password`]: Argon2id hashing of account passwords
//! - [`token`]: Ed25519-signed, time-limited session tokens
//!
//! The HTTP layer carries the token in a cookie and resolves it to
//! [`Claims`] before calling into the rest of the core.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenSigner, DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS};
