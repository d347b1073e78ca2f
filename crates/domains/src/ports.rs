//! Port traits implemented by the adapter crates.
//!
//! With the `testing` feature enabled, mockall generates a `MockXxx` for
//! every port so service logic can be tested without any adapter.

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use uuid::Uuid;

use crate::error::DomainResult;
use crate::post::{Comment, Page, Post, PostDetail, PostImage, PostQuery, PostRecord};
use crate::user::User;

/// Persistence contract for user records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert(&self, user: &User) -> DomainResult<()>;
    async fn find(&self, id: Uuid) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    /// Persists every mutable field of `user`.
    async fn update(&self, user: &User) -> DomainResult<()>;
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
    /// Admin listing: optional case-insensitive term over username, first
    /// and last name, and email; newest accounts first.
    async fn search<'a>(&self, term: Option<&'a str>, page: Page)
        -> DomainResult<(Vec<User>, u64)>;
}

/// Persistence contract for posts, their viewer sets, and their comments.
///
/// Implementations must provide per-row atomicity for the view
/// registration methods: the insert is a set-add (union), never a
/// read-modify-write, so concurrent duplicate registration cannot
/// double-count.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn insert(&self, post: &Post) -> DomainResult<()>;
    /// Fully hydrated fetch: author card, comment sequence with author
    /// cards, and the derived view count.
    async fn find(&self, id: Uuid) -> DomainResult<Option<PostDetail>>;
    /// The bare entity, for ownership and visibility checks.
    async fn find_bare(&self, id: Uuid) -> DomainResult<Option<Post>>;
    async fn update(&self, post: &Post) -> DomainResult<()>;
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// Published posts ordered by creation time descending, plus the total
    /// count for the filter. `viewer` fills `viewed_by_requester`.
    async fn list(
        &self,
        query: &PostQuery,
        page: Page,
        viewer: Option<Uuid>,
    ) -> DomainResult<(Vec<PostRecord>, u64)>;
    /// Pinned published posts, newest first.
    async fn list_pinned(&self, limit: u32) -> DomainResult<Vec<PostRecord>>;
    /// Published posts by one author, newest first.
    async fn list_by_author(&self, author_id: Uuid, page: Page)
        -> DomainResult<(Vec<PostRecord>, u64)>;

    /// Set-add of `viewer` into the post's viewer set. Returns true when
    /// the identity was newly added, false when it was already present.
    async fn register_view(&self, post_id: Uuid, viewer: Uuid) -> DomainResult<bool>;
    /// Bulk set-add across several posts for one viewer.
    async fn register_views(&self, post_ids: &[Uuid], viewer: Uuid) -> DomainResult<()>;

    async fn add_comment(&self, post_id: Uuid, comment: &Comment) -> DomainResult<()>;
    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid)
        -> DomainResult<Option<Comment>>;
    /// Removes exactly one comment. Returns false when no such comment
    /// exists on the post.
    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> DomainResult<bool>;

    /// Image handles attached to any post by `author_id`; fetched before a
    /// user-deletion cascade so the handles can be released.
    async fn images_by_author(&self, author_id: Uuid) -> DomainResult<Vec<PostImage>>;
    /// Removes every post by `author_id`, returning how many were deleted.
    async fn delete_by_author(&self, author_id: Uuid) -> DomainResult<u64>;
}

/// What the image host hands back for an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    /// Deletion handle, passed back to [`MediaStorage::delete`].
    pub storage_key: String,
}

/// Image storage collaborator. Both calls are fallible remote operations.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(
        &self,
        data: Bytes,
        folder: &str,
        content_type: &Mime,
    ) -> DomainResult<StoredImage>;
    async fn delete(&self, storage_key: &str) -> DomainResult<()>;
}

/// Credential hashing collaborator.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> DomainResult<String>;
    /// Constant-time verification against a stored hash. A malformed hash
    /// verifies as false, never as an error the caller could distinguish.
    async fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Bearer-token collaborator. The domain only ever sees the resolved user
/// id, never the token format.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenCodec: Send + Sync {
    fn issue(&self, user_id: Uuid) -> DomainResult<String>;
    fn verify(&self, token: &str) -> DomainResult<Uuid>;
}
