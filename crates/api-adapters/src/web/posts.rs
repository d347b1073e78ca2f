//! `/api/posts` handlers.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use domains::{NewPost, Page, PostQuery};
use serde::Deserialize;
use uuid::Uuid;

use super::dto::{
    CommentBody, CommentMessageBody, MessageBody, PaginationDto, PinBody, PinnedBody, PostBody,
    PostListBody, PostMessageBody, UpdatePostBody,
};
use super::error::ApiError;
use super::extract::{image_field, multipart_error, text_field, AdminAuth, Auth, MaybeAuth};
use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list)
                .post(create)
                .layer(DefaultBodyLimit::max(super::UPLOAD_BODY_LIMIT)),
        )
        .route("/pinned", get(pinned))
        .route("/{id}", get(detail).put(update).delete(remove))
        .route("/{id}/pin", put(toggle_pin))
        .route("/{id}/comments", post(add_comment))
        .route(
            "/{id}/comments/{comment_id}",
            axum::routing::delete(remove_comment),
        )
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<u32>,
    limit: Option<u32>,
    category: Option<String>,
    search: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    MaybeAuth(requester): MaybeAuth,
    Query(params): Query<ListParams>,
) -> Result<Json<PostListBody>, ApiError> {
    let page = Page::new(params.page.unwrap_or(1), params.limit.unwrap_or(10))?;
    let category = params.category.as_deref().map(str::parse).transpose()?;
    let query = PostQuery::new(category, params.search);

    let (records, meta) = state.posts().list(&query, page, requester.as_ref()).await?;
    Ok(Json(PostListBody {
        posts: records.into_iter().map(Into::into).collect(),
        pagination: PaginationDto::from(meta),
    }))
}

async fn pinned(State(state): State<AppState>) -> Result<Json<PinnedBody>, ApiError> {
    let records = state.posts().pinned().await?;
    Ok(Json(PinnedBody {
        posts: records.into_iter().map(Into::into).collect(),
    }))
}

async fn detail(
    State(state): State<AppState>,
    MaybeAuth(requester): MaybeAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<PostBody>, ApiError> {
    let detail = state.posts().get(id, requester.as_ref()).await?;
    Ok(Json(PostBody {
        post: detail.into(),
    }))
}

/// Multipart creation: text fields `title`, `content`, `category`,
/// repeated `tags`, and up to five `images` file parts.
async fn create(
    State(state): State<AppState>,
    Auth(identity): Auth,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PostMessageBody>), ApiError> {
    let mut title = String::new();
    let mut content = String::new();
    let mut category = None;
    let mut tags = Vec::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("title") => title = text_field(field).await?,
            Some("content") => content = text_field(field).await?,
            Some("category") => {
                let raw = text_field(field).await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    category = Some(raw.parse()?);
                }
            }
            Some("tags") => {
                let raw = text_field(field).await?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    tags.push(raw.to_string());
                }
            }
            Some("images") => uploads.push(image_field(field).await?),
            // Unknown fields are ignored.
            _ => {}
        }
    }

    let input = NewPost {
        title,
        body: content,
        category,
        tags,
    };
    let detail = state.posts().create(&identity, input, uploads).await?;
    Ok((
        StatusCode::CREATED,
        Json(PostMessageBody {
            message: "Post created successfully",
            post: detail.into(),
        }),
    ))
}

async fn update(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePostBody>,
) -> Result<Json<PostMessageBody>, ApiError> {
    let patch = body.into_patch()?;
    let detail = state.posts().update(id, &identity, patch).await?;
    Ok(Json(PostMessageBody {
        message: "Post updated successfully",
        post: detail.into(),
    }))
}

async fn remove(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageBody>, ApiError> {
    state.posts().delete(id, &identity).await?;
    Ok(Json(MessageBody {
        message: "Post deleted successfully",
    }))
}

async fn add_comment(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentBody>,
) -> Result<(StatusCode, Json<CommentMessageBody>), ApiError> {
    let record = state.posts().add_comment(id, &identity, &body.content).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentMessageBody {
            message: "Comment added successfully",
            comment: record.into(),
        }),
    ))
}

async fn remove_comment(
    State(state): State<AppState>,
    Auth(identity): Auth,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageBody>, ApiError> {
    state
        .posts()
        .remove_comment(post_id, comment_id, &identity)
        .await?;
    Ok(Json(MessageBody {
        message: "Comment deleted successfully",
    }))
}

async fn toggle_pin(
    State(state): State<AppState>,
    AdminAuth(identity): AdminAuth,
    Path(id): Path<Uuid>,
) -> Result<Json<PinBody>, ApiError> {
    let post = state.posts().toggle_pin(id, &identity).await?;
    Ok(Json(PinBody {
        message: if post.is_pinned {
            "Post pinned"
        } else {
            "Post unpinned"
        },
        is_pinned: post.is_pinned,
    }))
}
