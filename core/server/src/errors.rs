use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use docdrive_common::Error;

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(Error::InvalidInput(rejection.body_text()))
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str, String) {
        match &self.0 {
            Error::Authentication(msg) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "authentication_required",
                msg.clone(),
            ),
            Error::AuthorizationExpired(msg) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "authorization_expired",
                msg.clone(),
            ),
            Error::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "file_not_found",
                msg.clone(),
            ),
            Error::Provider(msg) => (
                StatusCode::BAD_GATEWAY,
                "provider_error",
                "drive_request_failed",
                msg.clone(),
            ),
            Error::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_parameter",
                msg.clone(),
            ),
            Error::Io(_) | Error::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal_server_error",
                "internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = self.parts();

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (Error::AuthorizationExpired("x".into()), StatusCode::UNAUTHORIZED),
            (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (Error::Provider("x".into()), StatusCode::BAD_GATEWAY),
            (Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (Error::Serialization("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = ApiError(Error::Io(std::io::Error::other("disk on fire")));
        let (_, _, _, msg) = err.parts();
        assert_eq!(msg, "internal server error");
    }
}
