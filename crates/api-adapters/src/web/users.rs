//! `/api/users` handlers: public profiles plus the admin directory.

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use domains::Page;
use serde::Deserialize;
use uuid::Uuid;

use super::dto::{
    AuthorPostsBody, MessageBody, ProfileBody, StatusBody, UpdateUserBody, UserListBody,
    UserMessageBody,
};
use super::error::ApiError;
use super::extract::{AdminAuth, Auth, MaybeAuth};
use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(directory))
        .route("/{id}", get(profile).put(update).delete(remove))
        .route("/{id}/status", put(toggle_status))
        .route("/{id}/posts", get(posts_of))
}

#[derive(Debug, Deserialize)]
struct DirectoryParams {
    page: Option<u32>,
    limit: Option<u32>,
    search: Option<String>,
}

async fn directory(
    State(state): State<AppState>,
    AdminAuth(identity): AdminAuth,
    Query(params): Query<DirectoryParams>,
) -> Result<Json<UserListBody>, ApiError> {
    let page = Page::new(params.page.unwrap_or(1), params.limit.unwrap_or(20))?;
    let (users, meta) = state
        .users()
        .list(&identity, params.search.as_deref(), page)
        .await?;
    Ok(Json(UserListBody::new(users, meta)))
}

async fn profile(
    State(state): State<AppState>,
    MaybeAuth(requester): MaybeAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileBody>, ApiError> {
    let (user, posts) = state.users().profile(id, requester.as_ref()).await?;
    Ok(Json(ProfileBody {
        user: user.into(),
        posts: posts.into_iter().map(Into::into).collect(),
    }))
}

async fn update(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserBody>,
) -> Result<Json<UserMessageBody>, ApiError> {
    let patch = body.into_patch()?;
    let user = state.users().update_user(id, &identity, patch).await?;
    Ok(Json(UserMessageBody {
        message: "User updated successfully",
        user: user.into(),
    }))
}

async fn toggle_status(
    State(state): State<AppState>,
    AdminAuth(identity): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusBody>, ApiError> {
    let user = state.users().toggle_active(id, &identity).await?;
    Ok(Json(StatusBody {
        message: if user.is_active {
            "User activated"
        } else {
            "User deactivated"
        },
        is_active: user.is_active,
    }))
}

async fn remove(
    State(state): State<AppState>,
    AdminAuth(identity): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageBody>, ApiError> {
    state.users().delete_user(id, &identity).await?;
    Ok(Json(MessageBody {
        message: "User deleted successfully",
    }))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<u32>,
    limit: Option<u32>,
}

async fn posts_of(
    State(state): State<AppState>,
    MaybeAuth(requester): MaybeAuth,
    Path(id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<AuthorPostsBody>, ApiError> {
    let page = Page::new(params.page.unwrap_or(1), params.limit.unwrap_or(10))?;
    let (posts, meta) = state.users().posts_of(id, page, requester.as_ref()).await?;
    Ok(Json(AuthorPostsBody::new(posts, meta)))
}
