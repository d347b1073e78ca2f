//! `/api/auth` handlers: registration, login, and self-service account
//! operations.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use domains::DomainError;

use super::dto::{
    AuthBody, LoginBody, MessageBody, PasswordBody, ProfilePatchBody, RegisterBody, UserBody,
    UserMessageBody,
};
use super::error::ApiError;
use super::extract::{image_field, multipart_error, Auth};
use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .route(
            "/profile-picture",
            post(set_avatar).layer(DefaultBodyLimit::max(super::AVATAR_BODY_LIMIT)),
        )
        .route("/password", put(change_password))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<AuthBody>), ApiError> {
    let (user, token) = state.users().register(body.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthBody {
            message: "User registered successfully",
            user: user.into(),
            token,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<AuthBody>, ApiError> {
    let (user, token) = state.users().login(&body.email, &body.password).await?;
    Ok(Json(AuthBody {
        message: "Login successful",
        user: user.into(),
        token,
    }))
}

async fn me(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<Json<UserBody>, ApiError> {
    let user = state.users().current(&identity).await?;
    Ok(Json(UserBody { user: user.into() }))
}

async fn update_profile(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(body): Json<ProfilePatchBody>,
) -> Result<Json<UserMessageBody>, ApiError> {
    let user = state
        .users()
        .update_profile(&identity, body.into())
        .await?;
    Ok(Json(UserMessageBody {
        message: "Profile updated successfully",
        user: user.into(),
    }))
}

/// Multipart upload with a single `profilePicture` file part.
async fn set_avatar(
    State(state): State<AppState>,
    Auth(identity): Auth,
    mut multipart: Multipart,
) -> Result<Json<UserMessageBody>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("profilePicture") {
            upload = Some(image_field(field).await?);
        }
    }
    let upload = upload
        .ok_or_else(|| DomainError::validation("profilePicture", "No image file provided."))?;

    let user = state.users().set_avatar(&identity, upload).await?;
    Ok(Json(UserMessageBody {
        message: "Profile picture updated successfully.",
        user: user.into(),
    }))
}

async fn change_password(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Json(body): Json<PasswordBody>,
) -> Result<Json<MessageBody>, ApiError> {
    state
        .users()
        .change_password(&identity, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(MessageBody {
        message: "Password changed successfully",
    }))
}
