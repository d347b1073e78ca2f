//! Core domain types and port definitions for the chess-club backend.
//!
//! Nothing in this crate performs I/O. Entities, validation, and the
//! authorization decision live here; adapters implement the port traits
//! declared in [`ports`].

pub mod error;
pub mod identity;
pub mod ports;
pub mod post;
pub mod user;

pub use error::{DomainError, DomainResult};
pub use identity::{AccessDecision, Identity, Role};
pub use ports::{MediaStorage, PasswordHasher, PostRepo, StoredImage, TokenCodec, UserRepo};
pub use post::{
    AuthorCard, Category, Comment, CommentRecord, ImageUpload, NewPost, Page, PageMeta,
    Post, PostDetail, PostImage, PostPatch, PostQuery, PostRecord,
};
pub use user::{Registration, User, UserPatch};
