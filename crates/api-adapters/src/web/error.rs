//! Domain failure to HTTP response translation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::DomainError;
use serde::Serialize;
use tracing::error;

/// Newtype carrying a [`DomainError`] out of a handler.
///
/// Every handler returns `Result<_, ApiError>` so `?` folds service
/// failures straight into the right status code and body.
#[derive(Debug)]
pub struct ApiError(DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

/// Wire shape of every error response: a message, plus field-level
/// detail for validation failures.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: &'static str,
    message: String,
}

impl ErrorBody {
    fn plain(message: impl Into<String>) -> Self {
        ErrorBody {
            message: message.into(),
            errors: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0 {
            DomainError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    message: message.clone(),
                    errors: Some(vec![FieldError { field, message }]),
                },
            ),
            DomainError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, ErrorBody::plain(message))
            }
            DomainError::Forbidden(message) => (StatusCode::FORBIDDEN, ErrorBody::plain(message)),
            DomainError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorBody::plain(format!("{resource} not found")),
            ),
            DomainError::Upstream(detail) => {
                // Surface a generic message; the detail stays in the logs.
                error!(%detail, "request failed on an upstream call");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::plain("Internal server error"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn rendered(err: DomainError) -> (StatusCode, String) {
        let response = ApiError::from(err).into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn not_found_names_the_resource() {
        let (status, body) = rendered(DomainError::NotFound("Post")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        insta::assert_snapshot!(body, @r#"{"message":"Post not found"}"#);
    }

    #[tokio::test]
    async fn validation_carries_field_detail() {
        let (status, body) =
            rendered(DomainError::validation("email", "Email already registered")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        insta::assert_snapshot!(
            body,
            @r#"{"message":"Email already registered","errors":[{"field":"email","message":"Email already registered"}]}"#
        );
    }

    #[tokio::test]
    async fn upstream_detail_is_not_leaked() {
        let (status, body) = rendered(DomainError::upstream("connection reset by peer")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("connection reset"));
        insta::assert_snapshot!(body, @r#"{"message":"Internal server error"}"#);
    }

    #[tokio::test]
    async fn forbidden_and_unauthorized_map_to_their_statuses() {
        let (status, _) = rendered(DomainError::forbidden("Admin access required")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = rendered(DomainError::unauthorized("Invalid token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
