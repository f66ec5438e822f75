//! Session cookie handling.
//!
//! The session token travels in the `jwt` cookie. [`AuthUser`] resolves it
//! before a handler runs: no cookie is a 401, a bad or expired token a 403.

use amity_core::{Claims, Error};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "jwt";

/// The caller identity resolved from the session cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError(Error::Unauthenticated))?;
        let claims = state.core.accounts.authenticate(&token)?;
        Ok(claims.into())
    }
}

/// Value of the session cookie, if present and non-empty.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value starting a session.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value ending a session.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0",
        SESSION_COOKIE
    )
}
