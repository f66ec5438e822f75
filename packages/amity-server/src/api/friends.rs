//! Friend-request and directory handlers.

use amity_core::Error;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::ApiResponse;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

// ── Request Types ────────────────────────────────────────────────────────────

/// GET /api/friends/search?query=
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// POST /api/friends/sendFriendRequest
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequestBody {
    pub target_user_id: Option<String>,
}

/// POST /api/friends/acceptFriendRequest, /declineFriendRequest
///
/// `requestId` is the id of the user who sent the request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondBody {
    pub request_id: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

pub async fn search(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    let users = state.core.directory.search(params.query.as_deref()).await?;
    Ok(ApiResponse::success(users))
}

pub async fn send_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SendRequestBody>,
) -> ApiResult<impl IntoResponse> {
    let target = required(body.target_user_id, "targetUserId")?;
    state.core.friends.send_request(&user.user_id, &target).await?;
    Ok(ApiResponse::success("Friend request sent"))
}

pub async fn accept_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<RespondBody>,
) -> ApiResult<impl IntoResponse> {
    let requester = required(body.request_id, "requestId")?;
    state.core.friends.accept_request(&user.user_id, &requester).await?;
    Ok(ApiResponse::success("Friend request accepted"))
}

pub async fn decline_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<RespondBody>,
) -> ApiResult<impl IntoResponse> {
    let requester = required(body.request_id, "requestId")?;
    state.core.friends.decline_request(&user.user_id, &requester).await?;
    Ok(ApiResponse::success("Friend request declined"))
}

pub async fn recommendations(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let users = state.core.friends.recommendations(&user.user_id).await?;
    Ok(ApiResponse::success(users))
}

pub async fn incoming_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let users = state.core.friends.incoming_requests(&user.user_id).await?;
    Ok(ApiResponse::success(users))
}

pub async fn list_friends(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let users = state.core.friends.list_friends(&user.user_id).await?;
    Ok(ApiResponse::success(users))
}

fn required(value: Option<String>, field: &str) -> Result<String, Error> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Validation(format!("{} is required", field)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_request_accept_flow() {
        let app = app().await;
        let (alice, alice_id) = signup(&app, "a@example.com", "alice").await;
        let (bob, bob_id) = signup(&app, "b@example.com", "bob").await;

        let sent = send(
            &app,
            post_json(
                "/api/friends/sendFriendRequest",
                Some(&alice),
                json!({ "targetUserId": bob_id }),
            ),
        )
        .await;
        assert_eq!(sent.status, StatusCode::OK);

        let again = send(
            &app,
            post_json(
                "/api/friends/sendFriendRequest",
                Some(&alice),
                json!({ "targetUserId": bob_id }),
            ),
        )
        .await;
        assert_eq!(again.status, StatusCode::BAD_REQUEST);
        assert_eq!(again.body["error"]["kind"], "duplicate_request");

        let pending = send(&app, get("/api/friends/allFriendRequests", Some(&bob))).await;
        assert_eq!(pending.body["data"][0]["id"], alice_id.as_str());
        assert_eq!(pending.body["data"][0]["name"], "alice");

        let accepted = send(
            &app,
            post_json(
                "/api/friends/acceptFriendRequest",
                Some(&bob),
                json!({ "requestId": alice_id }),
            ),
        )
        .await;
        assert_eq!(accepted.status, StatusCode::OK);

        let listed = send(&app, get("/api/friends/list", Some(&alice))).await;
        assert_eq!(listed.body["data"][0]["id"], bob_id.as_str());

        let pending = send(&app, get("/api/friends/allFriendRequests", Some(&bob))).await;
        assert_eq!(pending.body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_decline_without_request() {
        let app = app().await;
        let (alice, _) = signup(&app, "a@example.com", "alice").await;
        let (_, bob_id) = signup(&app, "b@example.com", "bob").await;

        let reply = send(
            &app,
            post_json(
                "/api/friends/declineFriendRequest",
                Some(&alice),
                json!({ "requestId": bob_id }),
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"]["kind"], "no_such_request");
    }

    #[tokio::test]
    async fn test_send_to_unknown_user() {
        let app = app().await;
        let (alice, _) = signup(&app, "a@example.com", "alice").await;

        let reply = send(
            &app,
            post_json(
                "/api/friends/sendFriendRequest",
                Some(&alice),
                json!({ "targetUserId": "ghost" }),
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);

        let missing = send(
            &app,
            post_json("/api/friends/sendFriendRequest", Some(&alice), json!({})),
        )
        .await;
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.body["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn test_search() {
        let app = app().await;
        let (alice, _) = signup(&app, "a@example.com", "Anna").await;
        signup(&app, "j@example.com", "Joanna").await;
        signup(&app, "b@example.com", "Bob").await;

        let reply = send(&app, get("/api/friends/search?query=ann", Some(&alice))).await;
        assert_eq!(reply.status, StatusCode::OK);
        let names: Vec<&str> = reply.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Anna", "Joanna"]);

        let empty = send(&app, get("/api/friends/search?query=", Some(&alice))).await;
        assert_eq!(empty.status, StatusCode::BAD_REQUEST);
        assert_eq!(empty.body["error"]["kind"], "invalid_query");

        let absent = send(&app, get("/api/friends/search", Some(&alice))).await;
        assert_eq!(absent.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_recommendations_require_session() {
        let app = app().await;
        let reply = send(&app, get("/api/friends/recommendations", None)).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

        let (alice, _) = signup(&app, "a@example.com", "alice").await;
        let reply = send(&app, get("/api/friends/recommendations", Some(&alice))).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["data"], json!([]));
    }
}
