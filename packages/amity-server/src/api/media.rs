//! Media handlers: upload, search, per-user listing, delete and file serving.

use amity_core::{Error, MediaKind, MediaQuery, MediaSort, SortOrder};
use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use super::ApiResponse;
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/media/search
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSearchParams {
    pub filename: Option<String>,
    /// `image` or `video`
    pub kind: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl MediaSearchParams {
    fn into_query(self) -> Result<MediaQuery, Error> {
        let kind = match non_empty(self.kind) {
            Some(kind) => Some(
                MediaKind::parse(&kind)
                    .ok_or_else(|| Error::Validation(format!("Unknown media kind: {}", kind)))?,
            ),
            None => None,
        };

        Ok(MediaQuery {
            filename: non_empty(self.filename),
            kind,
            created_from: non_empty(self.start_date).map(|d| parse_date(&d)).transpose()?,
            created_to: non_empty(self.end_date).map(|d| parse_date(&d)).transpose()?,
            sort: match non_empty(self.sort_by) {
                Some(sort) => MediaSort::parse(&sort)?,
                None => MediaSort::default(),
            },
            order: match non_empty(self.order) {
                Some(order) => SortOrder::parse(&order)?,
                None => SortOrder::default(),
            },
        })
    }
}

/// POST /api/media/upload
///
/// Multipart form with a single `file` field.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to read upload file bytes");
            Error::Validation(format!("Failed to read file data: {}", e))
        })?;

        let record = state
            .core
            .media
            .upload(&user.user_id, &filename, &content_type, bytes)
            .await?;
        return Ok((StatusCode::CREATED, ApiResponse::success(record)));
    }

    Err(Error::Validation("No file uploaded".into()).into())
}

/// GET /api/media/search
pub async fn search(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<MediaSearchParams>,
) -> ApiResult<impl IntoResponse> {
    let query = params.into_query()?;
    let media = state.core.media.search(&query)?;
    Ok(ApiResponse::success(media))
}

/// GET /api/media/user/:userId
pub async fn list_for_user(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let media = state.core.media.list_for_user(&user_id)?;
    Ok(ApiResponse::success(media))
}

/// DELETE /api/media/:mediaId
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(media_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.core.media.delete(&user.user_id, &media_id).await?;
    Ok(ApiResponse::success("Media deleted successfully"))
}

/// GET /media/files/*key
///
/// No session required; keys embed a content hash and are not enumerable.
pub async fn fetch(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (record, bytes) = state.core.media.fetch(key.trim_start_matches('/')).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&record.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok((StatusCode::OK, headers, Body::from(bytes)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Epoch millis from an RFC 3339 timestamp, a `YYYY-MM-DD` date (midnight
/// UTC) or a raw millisecond count.
fn parse_date(value: &str) -> Result<i64, Error> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp_millis());
        }
    }
    value
        .parse::<i64>()
        .map_err(|_| Error::Validation(format!("Invalid date: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "amity-test-boundary";

    fn upload_request(cookie: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::post("/api/media/upload")
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn delete_request(uri: &str, cookie: &str) -> Request<Body> {
        Request::delete(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("1970-01-02").unwrap(), 86_400_000);
        assert_eq!(parse_date("1970-01-01T00:00:01Z").unwrap(), 1_000);
        assert_eq!(parse_date("42").unwrap(), 42);
        assert!(matches!(parse_date("yesterday"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_search_params() {
        let query = MediaSearchParams {
            filename: Some("beach".into()),
            kind: Some("image".into()),
            sort_by: Some("filename".into()),
            order: Some("asc".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.filename.as_deref(), Some("beach"));
        assert_eq!(query.kind, Some(MediaKind::Image));
        assert_eq!(query.sort, MediaSort::Filename);
        assert_eq!(query.order, SortOrder::Asc);

        let bad = MediaSearchParams {
            sort_by: Some("size".into()),
            ..Default::default()
        };
        assert!(matches!(bad.into_query(), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_fetch_delete() {
        let app = app().await;
        let (alice, alice_id) = signup(&app, "a@example.com", "alice").await;
        let (bob, _) = signup(&app, "b@example.com", "bob").await;

        let uploaded = send(&app, upload_request(&alice, "beach.png", "image/png", b"png-bytes")).await;
        assert_eq!(uploaded.status, StatusCode::CREATED);
        let record = &uploaded.body["data"];
        assert_eq!(record["kind"], "image");
        assert_eq!(record["ownerId"], alice_id.as_str());
        let id = record["id"].as_str().unwrap().to_string();
        let key = record["storageKey"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(get(&format!("/media/files/{}", key), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"png-bytes");

        let listed = send(&app, get(&format!("/api/media/user/{}", alice_id), Some(&bob))).await;
        assert_eq!(listed.body["data"].as_array().unwrap().len(), 1);

        let forbidden = send(&app, delete_request(&format!("/api/media/{}", id), &bob)).await;
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let deleted = send(&app, delete_request(&format!("/api/media/{}", id), &alice)).await;
        assert_eq!(deleted.status, StatusCode::OK);

        let gone = send(&app, delete_request(&format!("/api/media/{}", id), &alice)).await;
        assert_eq!(gone.status, StatusCode::NOT_FOUND);
        assert_eq!(gone.body["error"]["kind"], "media_not_found");
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let app = app().await;
        let (alice, _) = signup(&app, "a@example.com", "alice").await;

        let reply = send(&app, upload_request(&alice, "notes.txt", "text/plain", b"hello")).await;
        assert_eq!(reply.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(reply.body["error"]["kind"], "unsupported_media");
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let app = app().await;
        let (alice, _) = signup(&app, "a@example.com", "alice").await;
        send(&app, upload_request(&alice, "beach.png", "image/png", b"1")).await;
        send(&app, upload_request(&alice, "clip.mp4", "video/mp4", b"2")).await;

        let videos = send(&app, get("/api/media/search?kind=video", Some(&alice))).await;
        assert_eq!(videos.status, StatusCode::OK);
        let data = videos.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["filename"], "clip.mp4");

        let bad = send(&app, get("/api/media/search?sortBy=size", Some(&alice))).await;
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    }
}
