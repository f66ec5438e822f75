//! # Accounts
//!
//! Signup, login and profile management.
//!
//! ```text
//! signup ──► validate ──► uniqueness ──► argon2 hash ──► insert ──► token
//! login  ──► lookup by email ──► verify hash ──► token
//! ```
//!
//! Unknown email and wrong password both fail with
//! [`Error::InvalidCredentials`].

use std::sync::Arc;

use serde::Deserialize;

use crate::auth::{self, Claims, TokenSigner};
use crate::error::{Error, Result, StoreError};
use crate::storage::UserStore;
use crate::users::{AccountView, User};

/// Runs of a profile update before a write conflict is surfaced.
const PROFILE_SAVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub avatar: Option<String>,
}

/// A logged-in account and its session token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub account: AccountView,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenSigner>,
}

impl AccountService {
    pub fn new(store: Arc<dyn UserStore>, tokens: Arc<TokenSigner>) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenSigner {
        &self.tokens
    }

    /// Resolve a session token to its claims.
    pub fn authenticate(&self, token: &str) -> Result<Claims> {
        self.tokens.verify(token)
    }

    /// Create an account and start a session.
    pub async fn signup(&self, request: SignupRequest) -> Result<AuthSession> {
        let email = required(request.email.as_deref(), "Email")?.to_lowercase();
        let username = required(request.username.as_deref(), "Username")?.to_string();
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Validation("Password is required".into()))?;

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(Error::EmailTaken);
        }
        if self.store.find_by_username(&username).await?.is_some() {
            return Err(Error::UsernameTaken);
        }

        let password_hash = blocking(move || auth::hash_password(&password)).await?;
        let mut user = User::new(username, email, password_hash);

        // The lookups above can race another signup; the unique columns decide.
        self.store.insert(&mut user).await.map_err(|e| match e {
            StoreError::Duplicate("email") => Error::EmailTaken,
            StoreError::Duplicate("username") => Error::UsernameTaken,
            other => Error::Store(other),
        })?;

        tracing::info!(user_id = user.id.as_str(), "Account created");
        self.session_for(&user)
    }

    /// Check credentials and start a session.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession> {
        let (email, password) = match (request.email.as_deref(), request.password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                (email.trim().to_lowercase(), password)
            }
            _ => return Err(Error::Validation("Email and password are required".into())),
        };

        let user = self
            .store
            .find_by_email(&email)
            .await?
            .ok_or(Error::InvalidCredentials)?;

        let phc = user.password_hash.clone();
        if !blocking(move || auth::verify_password(&password, &phc)).await? {
            tracing::debug!(user_id = user.id.as_str(), "Login rejected");
            return Err(Error::InvalidCredentials);
        }

        tracing::info!(user_id = user.id.as_str(), "Login");
        self.session_for(&user)
    }

    pub async fn get_user(&self, id: &str) -> Result<AccountView> {
        self.store
            .find_by_id(id)
            .await?
            .map(|user| AccountView::from(&user))
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    /// Apply a partial profile update; marks the profile complete.
    pub async fn update_profile(&self, self_id: &str, update: ProfileUpdate) -> Result<AccountView> {
        let username = match update.username.as_deref().map(str::trim) {
            Some("") => return Err(Error::Validation("Username cannot be empty".into())),
            other => other.map(str::to_string),
        };

        let mut run = 1;
        loop {
            let mut user = self
                .store
                .find_by_id(self_id)
                .await?
                .ok_or_else(|| Error::UserNotFound(self_id.to_string()))?;

            if let Some(username) = &username {
                if *username != user.username {
                    if let Some(owner) = self.store.find_by_username(username).await? {
                        if owner.id != user.id {
                            return Err(Error::UsernameTaken);
                        }
                    }
                    user.username = username.clone();
                }
            }
            if let Some(bio) = &update.bio {
                user.bio = Some(bio.clone());
            }
            if let Some(interests) = &update.interests {
                user.interests = interests.clone();
            }
            if let Some(avatar) = &update.avatar {
                user.avatar = Some(avatar.clone());
            }
            user.profile_complete = true;

            match self.store.save(&mut user).await {
                Ok(()) => {
                    tracing::info!(user_id = self_id, "Profile updated");
                    return Ok(AccountView::from(&user));
                }
                Err(StoreError::Conflict(_)) if run < PROFILE_SAVE_ATTEMPTS => {
                    tracing::debug!(user_id = self_id, run, "Profile write conflict, re-running");
                    run += 1;
                }
                Err(StoreError::Duplicate("username")) => return Err(Error::UsernameTaken),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn session_for(&self, user: &User) -> Result<AuthSession> {
        let token = self.tokens.issue(&user.id, &user.email)?;
        Ok(AuthSession {
            account: AccountView::from(user),
            token,
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Validation(format!("{} is required", field)))
}

/// Run CPU-heavy hashing off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Hashing task failed: {}", e)))?
}
