//! REST API.
//!
//! ```text
//! /health
//! /api/auth/*      signup, login, logout, userinfo, user/:id, updateProfile
//! /api/friends/*   search, send/accept/decline, recommendations, lists
//! /api/media/*     upload, search, user/:userId, :mediaId (DELETE)
//! /media/files/*   stored bytes
//! ```
//!
//! Successful responses use the `{ ok: true, data }` envelope; failures are
//! rendered by [`ApiError`](crate::error::ApiError).

pub mod accounts;
pub mod friends;
pub mod media;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Generic success response.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            ok: true,
            data: Some(data),
        })
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/userinfo", get(accounts::user_info))
        .route("/user/:id", get(accounts::get_user))
        .route("/updateProfile", post(accounts::update_profile));

    let friends = Router::new()
        .route("/search", get(friends::search))
        .route("/sendFriendRequest", post(friends::send_request))
        .route("/acceptFriendRequest", post(friends::accept_request))
        .route("/declineFriendRequest", post(friends::decline_request))
        .route("/recommendations", get(friends::recommendations))
        .route("/allFriendRequests", get(friends::incoming_requests))
        .route("/list", get(friends::list_friends));

    let media = Router::new()
        .route("/upload", post(media::upload))
        .route("/search", get(media::search))
        .route("/user/:userId", get(media::list_for_user))
        .route("/:mediaId", delete(media::delete));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/auth", auth)
        .nest("/api/friends", friends)
        .nest("/api/media", media)
        .route("/media/files/*key", get(media::fetch))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes()))
        .layer(cors_layer(&state.config.allowed_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Invalid allowed origin, cross-origin requests disabled");
            cors
        }
    }
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "amity-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for driving the router in handler tests.

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::build_router;
    use crate::state::AppState;

    pub async fn app() -> Router {
        build_router(AppState::in_memory().await)
    }

    pub struct Reply {
        pub status: StatusCode,
        pub set_cookie: Option<String>,
        pub body: Value,
    }

    pub async fn send(app: &Router, request: Request<Body>) -> Reply {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            set_cookie,
            body,
        }
    }

    pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    pub fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// Sign up and return `(cookie header, user id)`.
    pub async fn signup(app: &Router, email: &str, username: &str) -> (String, String) {
        let reply = send(
            app,
            post_json(
                "/api/auth/signup",
                None,
                serde_json::json!({ "email": email, "password": "hunter2", "username": username }),
            ),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let set_cookie = reply.set_cookie.unwrap();
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let id = reply.body["data"]["id"].as_str().unwrap().to_string();
        (cookie, id)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let reply = send(&app, get("/health", None)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["status"], "ok");
        assert_eq!(reply.body["service"], "amity-server");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app().await;
        let reply = send(&app, get("/api/nope", None)).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }
}
