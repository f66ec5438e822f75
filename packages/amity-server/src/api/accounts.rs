//! Account handlers: signup, login, logout and profiles.

use amity_core::{AuthSession, LoginRequest, ProfileUpdate, SignupRequest};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use super::ApiResponse;
use crate::auth::{clear_session_cookie, session_cookie, AuthUser};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.core.accounts.signup(request).await?;
    Ok(with_session(&state, StatusCode::CREATED, session))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.core.accounts.login(request).await?;
    Ok(with_session(&state, StatusCode::OK, session))
}

/// POST /api/auth/logout
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        ApiResponse::success("Logout successful"),
    )
}

/// GET /api/auth/userinfo
pub async fn user_info(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let account = state.core.accounts.get_user(&user.user_id).await?;
    Ok(ApiResponse::success(account))
}

/// GET /api/auth/user/:id
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let account = state.core.accounts.get_user(&id).await?;
    Ok(ApiResponse::success(account))
}

/// POST /api/auth/updateProfile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let account = state.core.accounts.update_profile(&user.user_id, update).await?;
    Ok(ApiResponse::success(account))
}

fn with_session(state: &AppState, status: StatusCode, session: AuthSession) -> impl IntoResponse {
    let cookie = session_cookie(&session.token, state.core.accounts.tokens().ttl_secs());
    (
        status,
        [(header::SET_COOKIE, cookie)],
        ApiResponse::success(session.account),
    )
}
