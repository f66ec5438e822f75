//! HTTP rendering of core errors.

use amity_core::{Error, StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// A core error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub Error);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_)
            | Error::InvalidQuery(_)
            | Error::DuplicateRequest
            | Error::NoSuchRequest
            | Error::CannotAddSelf
            | Error::EmailTaken
            | Error::UsernameTaken => StatusCode::BAD_REQUEST,
            Error::Unauthenticated | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::InvalidToken(_) | Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::UserNotFound(_) | Error::MediaNotFound(_) => StatusCode::NOT_FOUND,
            Error::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            Error::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), code = self.0.code(), error = %self.0, "Request failed");
        } else {
            tracing::debug!(kind = self.0.kind(), error = %self.0, "Request rejected");
        }

        let body = json!({
            "ok": false,
            "error": {
                "kind": self.0.kind(),
                "code": self.0.code(),
                "message": self.0.to_string(),
            },
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidQuery("empty".into()), StatusCode::BAD_REQUEST),
            (Error::DuplicateRequest, StatusCode::BAD_REQUEST),
            (Error::NoSuchRequest, StatusCode::BAD_REQUEST),
            (Error::Unauthenticated, StatusCode::UNAUTHORIZED),
            (Error::InvalidToken("expired".into()), StatusCode::FORBIDDEN),
            (Error::UserNotFound("u1".into()), StatusCode::NOT_FOUND),
            (Error::Store(StoreError::Conflict("u1".into())), StatusCode::CONFLICT),
            (Error::UnsupportedMedia("a.txt".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (Error::Store(StoreError::Backend("boom".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::PartialFailure {
                    committed: "a".into(),
                    pending: "b".into(),
                    source: StoreError::Unavailable("busy".into()),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code(), status);
        }
    }

    #[test]
    fn test_response_status() {
        let response = ApiError(Error::NoSuchRequest).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
