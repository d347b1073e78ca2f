//! Identity extractors and multipart helpers.
//!
//! The three auth extractors mirror the gate the services expect: attach
//! if possible, require, require admin. Token resolution always goes
//! through [`services::UserService::authenticate`], so a deactivated
//! account stops resolving the moment the flag flips.

use std::convert::Infallible;

use axum::extract::multipart::Field;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::{DomainError, Identity, ImageUpload};
use mime::Mime;

use super::error::ApiError;
use super::AppState;

/// Proof of a signed-in caller. Rejects with 401 when the bearer token
/// is missing, invalid, expired, or belongs to a deactivated account.
#[derive(Debug, Clone, Copy)]
pub struct Auth(pub Identity);

/// Best-effort identity. Never fails the request; anonymous and
/// bad-token callers both come through as `None`.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuth(pub Option<Identity>);

/// Admin gate: 401 without a usable token, 403 for non-admins.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth(pub Identity);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| DomainError::unauthorized("Authentication required"))?;
        let identity = state.users().authenticate(token).await?;
        Ok(Auth(identity))
    }
}

impl FromRequestParts<AppState> for MaybeAuth {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = match bearer_token(parts) {
            Some(token) => state.users().authenticate(token).await.ok(),
            None => None,
        };
        Ok(MaybeAuth(identity))
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            return Err(DomainError::forbidden("Admin access required").into());
        }
        Ok(AdminAuth(identity))
    }
}

/// Reads a text field out of a multipart form.
pub(crate) async fn text_field(field: Field<'_>) -> Result<String, ApiError> {
    field.text().await.map_err(multipart_error)
}

/// Reads a file field into an [`ImageUpload`].
///
/// The content type comes from the part header, falling back to a guess
/// from the file name; size and `image/*` enforcement stay with the
/// domain validation downstream.
pub(crate) async fn image_field(field: Field<'_>) -> Result<ImageUpload, ApiError> {
    let content_type = field
        .content_type()
        .and_then(|value| value.parse::<Mime>().ok())
        .or_else(|| {
            field
                .file_name()
                .map(|name| mime_guess::from_path(name).first_or_octet_stream())
        })
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);
    let data = field.bytes().await.map_err(multipart_error)?;
    Ok(ImageUpload { data, content_type })
}

pub(crate) fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    DomainError::validation("body", format!("could not read multipart body: {err}")).into()
}
