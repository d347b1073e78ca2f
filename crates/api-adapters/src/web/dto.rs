//! Wire representations.
//!
//! Responses are camelCase JSON; the shapes here are the public contract
//! the club's SPA consumes. Domain entities never serialize directly;
//! everything crosses through an explicit mapping so internal fields
//! (password hashes, storage keys) cannot leak by accident.

use chrono::{DateTime, Utc};
use domains::{
    AuthorCard, CommentRecord, DomainError, DomainResult, PageMeta, PostDetail, PostImage,
    PostPatch, PostRecord, Registration, Role, User, UserPatch,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub chess_rating: Option<i32>,
    pub role: &'static str,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_picture: user.avatar_url,
            chess_rating: user.rating,
            role: user.role.as_str(),
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Author display fields attached to posts and comments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub bio: String,
}

impl From<AuthorCard> for AuthorDto {
    fn from(card: AuthorCard) -> Self {
        AuthorDto {
            id: card.id,
            first_name: card.first_name,
            last_name: card.last_name,
            profile_picture: card.avatar_url,
            bio: card.bio,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageDto {
    pub url: String,
    pub caption: String,
}

impl From<PostImage> for ImageDto {
    fn from(image: PostImage) -> Self {
        ImageDto {
            url: image.url,
            caption: image.caption,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: Uuid,
    pub user: AuthorDto,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRecord> for CommentDto {
    fn from(record: CommentRecord) -> Self {
        CommentDto {
            id: record.comment.id,
            user: record.author.into(),
            content: record.comment.body,
            created_at: record.comment.created_at,
        }
    }
}

/// A post as listings render it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: Uuid,
    pub author: AuthorDto,
    pub title: String,
    pub content: String,
    pub category: &'static str,
    pub tags: Vec<String>,
    pub images: Vec<ImageDto>,
    pub view_count: u64,
    pub comment_count: u64,
    /// Whether the requester is already in the viewer set. Always false
    /// for anonymous requests.
    pub viewed_by_me: bool,
    pub is_published: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRecord> for PostDto {
    fn from(record: PostRecord) -> Self {
        let post = record.post;
        PostDto {
            id: post.id,
            author: record.author.into(),
            title: post.title,
            content: post.body,
            category: post.category.as_str(),
            tags: post.tags,
            images: post.images.into_iter().map(Into::into).collect(),
            view_count: record.view_count,
            comment_count: record.comment_count,
            viewed_by_me: record.viewed_by_requester,
            is_published: post.is_published,
            is_pinned: post.is_pinned,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// The single-post fetch: everything in [`PostDto`] plus the comments.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetailDto {
    pub id: Uuid,
    pub author: AuthorDto,
    pub title: String,
    pub content: String,
    pub category: &'static str,
    pub tags: Vec<String>,
    pub images: Vec<ImageDto>,
    pub comments: Vec<CommentDto>,
    pub view_count: u64,
    pub comment_count: u64,
    pub is_published: bool,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostDetail> for PostDetailDto {
    fn from(detail: PostDetail) -> Self {
        let comment_count = detail.comment_count();
        let post = detail.post;
        PostDetailDto {
            id: post.id,
            author: detail.author.into(),
            title: post.title,
            content: post.body,
            category: post.category.as_str(),
            tags: post.tags,
            images: post.images.into_iter().map(Into::into).collect(),
            comments: detail.comments.into_iter().map(Into::into).collect(),
            view_count: detail.view_count,
            comment_count,
            is_published: post.is_published,
            is_pinned: post.is_pinned,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_posts: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<PageMeta> for PaginationDto {
    fn from(meta: PageMeta) -> Self {
        PaginationDto {
            current_page: meta.current_page,
            total_pages: meta.total_pages,
            total_posts: meta.total,
            has_next: meta.has_next,
            has_prev: meta.has_prev,
        }
    }
}

// Envelopes. One struct per distinct response shape keeps the contract
// greppable.

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PostListBody {
    pub posts: Vec<PostDto>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct PinnedBody {
    pub posts: Vec<PostDto>,
}

#[derive(Debug, Serialize)]
pub struct PostBody {
    pub post: PostDetailDto,
}

#[derive(Debug, Serialize)]
pub struct PostMessageBody {
    pub message: &'static str,
    pub post: PostDetailDto,
}

#[derive(Debug, Serialize)]
pub struct CommentMessageBody {
    pub message: &'static str,
    pub comment: CommentDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinBody {
    pub message: &'static str,
    pub is_pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthBody {
    pub message: &'static str,
    pub user: UserDto,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct UserMessageBody {
    pub message: &'static str,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub message: &'static str,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListBody {
    pub users: Vec<UserDto>,
    pub total_pages: u32,
    pub current_page: u32,
    pub total: u64,
}

impl UserListBody {
    pub fn new(users: Vec<User>, meta: PageMeta) -> Self {
        UserListBody {
            users: users.into_iter().map(Into::into).collect(),
            total_pages: meta.total_pages,
            current_page: meta.current_page,
            total: meta.total,
        }
    }
}

/// Flat listing shape used by `/users/{id}/posts`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPostsBody {
    pub posts: Vec<PostDto>,
    pub total_pages: u32,
    pub current_page: u32,
    pub total: u64,
}

impl AuthorPostsBody {
    pub fn new(posts: Vec<PostRecord>, meta: PageMeta) -> Self {
        AuthorPostsBody {
            posts: posts.into_iter().map(Into::into).collect(),
            total_pages: meta.total_pages,
            current_page: meta.current_page,
            total: meta.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileBody {
    pub user: UserDto,
    pub posts: Vec<PostDto>,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<RegisterBody> for Registration {
    fn from(body: RegisterBody) -> Self {
        Registration {
            username: body.username,
            email: body.email,
            password: body.password,
            first_name: body.first_name,
            last_name: body.last_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatchBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub chess_rating: Option<i32>,
}

impl From<ProfilePatchBody> for UserPatch {
    fn from(body: ProfilePatchBody) -> Self {
        UserPatch {
            first_name: body.first_name,
            last_name: body.last_name,
            bio: body.bio,
            avatar_url: None,
            rating: body.chess_rating,
            role: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordBody {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

impl UpdatePostBody {
    pub fn into_patch(self) -> DomainResult<PostPatch> {
        let category = self.category.as_deref().map(str::parse).transpose()?;
        Ok(PostPatch {
            title: self.title,
            body: self.content,
            category,
            tags: self.tags,
            is_published: self.is_published,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    pub content: String,
}

/// Admin-or-self account update. `role` only sticks for admin callers;
/// the service drops it otherwise.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub chess_rating: Option<i32>,
    pub role: Option<String>,
}

impl UpdateUserBody {
    pub fn into_patch(self) -> DomainResult<UserPatch> {
        let role = self.role.as_deref().map(parse_role).transpose()?;
        Ok(UserPatch {
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            avatar_url: self.profile_picture,
            rating: self.chess_rating,
            role,
        })
    }
}

fn parse_role(value: &str) -> DomainResult<Role> {
    match value {
        "member" => Ok(Role::Member),
        "admin" => Ok(Role::Admin),
        _ => Err(DomainError::validation("role", "must be member or admin")),
    }
}
