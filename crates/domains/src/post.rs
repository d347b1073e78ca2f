//! Post aggregate: the entity, its embedded comments and images, the
//! validated inputs, and the pagination/search types shared by the listing
//! contract.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::user::User;

/// Fixed post category enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Strategy,
    Tournament,
    Training,
    News,
    Analysis,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::Strategy,
        Category::Tournament,
        Category::Training,
        Category::News,
        Category::Analysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Strategy => "strategy",
            Category::Tournament => "tournament",
            Category::Training => "training",
            Category::News => "news",
            Category::Analysis => "analysis",
        }
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DomainError::validation("category", format!("'{s}' is not a valid category")))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image attached to a post: its public URL plus the opaque handle the
/// image store needs to release it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostImage {
    pub url: String,
    pub storage_key: String,
    pub caption: String,
}

/// A comment embedded in a post. Never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub const BODY_MAX: usize = 1000;

    pub fn new(author_id: Uuid, body: String) -> Self {
        Comment {
            id: Uuid::now_v7(),
            author_id,
            body,
            created_at: Utc::now(),
        }
    }

    /// Trims and bounds a comment body.
    pub fn validate_body(body: &str) -> DomainResult<String> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DomainError::validation("content", "comment cannot be empty"));
        }
        if body.chars().count() > Self::BODY_MAX {
            return Err(DomainError::validation(
                "content",
                format!("comment cannot exceed {} characters", Self::BODY_MAX),
            ));
        }
        Ok(body.to_string())
    }
}

/// A club blog post.
///
/// The viewer set and the comment sequence are owned by the post; both are
/// persisted by the repository, and their sizes (`view_count`,
/// `comment_count`) are always derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// Immutable after creation.
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub images: Vec<PostImage>,
    pub is_published: bool,
    /// Stored and toggleable, but listing order is always creation-time
    /// descending; the flag only drives the dedicated pinned listing.
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub const TITLE_MAX: usize = 200;
    pub const BODY_MAX: usize = 10_000;
    pub const TAG_MAX: usize = 30;
    pub const MAX_IMAGES: usize = 5;
}

/// Raw bytes of an image as received from the client, before the image
/// store has seen them.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Bytes,
    pub content_type: Mime,
}

impl ImageUpload {
    /// 5 MiB per post image, matching the original upload limits.
    pub const MAX_BYTES: usize = 5 * 1024 * 1024;
    /// 2 MiB for profile pictures.
    pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

    pub fn validate(&self, max_bytes: usize) -> DomainResult<()> {
        if self.content_type.type_() != mime::IMAGE {
            return Err(DomainError::validation("images", "only image files are allowed"));
        }
        if self.data.len() > max_bytes {
            return Err(DomainError::validation(
                "images",
                format!("file too large, maximum size is {} bytes", max_bytes),
            ));
        }
        Ok(())
    }
}

/// Input for post creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub category: Option<Category>,
    pub tags: Vec<String>,
}

impl NewPost {
    pub fn validate(&mut self) -> DomainResult<()> {
        self.title = self.title.trim().to_string();
        self.body = self.body.trim().to_string();
        bounded("title", &self.title, 1, Post::TITLE_MAX)?;
        bounded("content", &self.body, 1, Post::BODY_MAX)?;
        validate_tags(&mut self.tags)
    }

    /// Builds the persisted entity. `images` have already been accepted by
    /// the image store.
    pub fn into_post(self, author_id: Uuid, images: Vec<PostImage>) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::now_v7(),
            author_id,
            title: self.title,
            body: self.body,
            category: self.category.unwrap_or(Category::General),
            tags: self.tags,
            images,
            is_published: true,
            is_pinned: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a post's mutable fields. Images and the pinned flag
/// have their own operations and are deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<Category>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

impl PostPatch {
    pub fn validate(&mut self) -> DomainResult<()> {
        if let Some(title) = &mut self.title {
            *title = title.trim().to_string();
            bounded("title", title, 1, Post::TITLE_MAX)?;
        }
        if let Some(body) = &mut self.body {
            *body = body.trim().to_string();
            bounded("content", body, 1, Post::BODY_MAX)?;
        }
        if let Some(tags) = &mut self.tags {
            validate_tags(tags)?;
        }
        Ok(())
    }

    pub fn apply(&self, post: &mut Post) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(body) = &self.body {
            post.body = body.clone();
        }
        if let Some(category) = self.category {
            post.category = category;
        }
        if let Some(tags) = &self.tags {
            post.tags = tags.clone();
        }
        if let Some(published) = self.is_published {
            post.is_published = published;
        }
        post.updated_at = Utc::now();
    }
}

fn validate_tags(tags: &mut Vec<String>) -> DomainResult<()> {
    for tag in tags.iter_mut() {
        *tag = tag.trim().to_string();
        bounded("tags", tag, 1, Post::TAG_MAX)?;
    }
    Ok(())
}

fn bounded(field: &'static str, value: &str, min: usize, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(DomainError::validation(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    if len > max {
        return Err(DomainError::validation(
            field,
            format!("cannot exceed {max} characters"),
        ));
    }
    Ok(())
}

/// Filter half of the listing contract.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub category: Option<Category>,
    /// Case-insensitive term matched against title OR body OR any tag.
    pub search: Option<String>,
}

impl PostQuery {
    pub fn new(category: Option<Category>, search: Option<String>) -> Self {
        let search = search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        PostQuery { category, search }
    }
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub const MAX_LIMIT: u32 = 50;

    pub fn new(page: u32, limit: u32) -> DomainResult<Self> {
        if page < 1 {
            return Err(DomainError::validation("page", "must be a positive integer"));
        }
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(DomainError::validation(
                "limit",
                format!("must be between 1 and {}", Self::MAX_LIMIT),
            ));
        }
        Ok(Page { page, limit })
    }

    pub fn offset(self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Derived pagination metadata, computed rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub total_pages: u32,
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    pub fn compute(page: Page, total: u64) -> Self {
        let limit = u64::from(page.limit);
        let total_pages = total.div_ceil(limit) as u32;
        PageMeta {
            current_page: page.page,
            total_pages,
            total,
            has_next: u64::from(page.page) * limit < total,
            has_prev: page.page > 1,
        }
    }
}

/// Display fields of an author, resolved by the repository via join.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorCard {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub bio: String,
}

impl From<&User> for AuthorCard {
    fn from(user: &User) -> Self {
        AuthorCard {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar_url: user.avatar_url.clone(),
            bio: user.bio.clone(),
        }
    }
}

/// A post as it appears in listings: entity plus derived counts.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: Post,
    pub author: AuthorCard,
    pub view_count: u64,
    pub comment_count: u64,
    /// Whether the requesting identity is already in the viewer set.
    /// Always false for anonymous requests.
    pub viewed_by_requester: bool,
}

/// A comment together with its author's display fields.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub comment: Comment,
    pub author: AuthorCard,
}

/// A fully hydrated post for the single-post fetch.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub author: AuthorCard,
    pub comments: Vec<CommentRecord>,
    pub view_count: u64,
}

impl PostDetail {
    /// Live length of the comment sequence, never a stored counter.
    pub fn comment_count(&self) -> u64 {
        self.comments.len() as u64
    }
}
