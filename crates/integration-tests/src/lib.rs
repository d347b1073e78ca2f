//! Shared fixtures for the workspace-level suites.
//!
//! Everything here builds the real service layer over the in-memory store,
//! with only the image store mocked. The HTTP-level suites add the router
//! on top of the same stack.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use services::{PostService, UserService};
use storage_adapters::mem::MemStore;

use domains::ports::MockMediaStorage;
use domains::{ImageUpload, NewPost, Registration, StoredImage, User};

static SEQ: AtomicU32 = AtomicU32::new(0);

/// The real services over one shared in-memory store.
pub struct TestStack {
    pub store: Arc<MemStore>,
    pub posts: PostService,
    pub users: UserService,
}

pub fn stack() -> TestStack {
    let mut media = MockMediaStorage::new();
    media.expect_upload().returning(|_, folder, _| {
        let key = format!("{folder}/aa/bb/{}.png", uuid::Uuid::now_v7().simple());
        Ok(StoredImage {
            url: format!("http://media.test/{key}"),
            storage_key: key,
        })
    });
    media.expect_delete().returning(|_| Ok(()));
    stack_with_media(media)
}

pub fn stack_with_media(media: MockMediaStorage) -> TestStack {
    let store = Arc::new(MemStore::new());
    let media = Arc::new(media);
    let posts = PostService::new(store.clone(), store.clone(), media.clone());
    let users = UserService::new(
        store.clone(),
        store.clone(),
        media,
        Arc::new(auth_adapters::ArgonHasher::default()),
        Arc::new(auth_adapters::JwtTokens::new(&secrecy::SecretString::from(
            "integration-test-secret",
        ))),
    );
    TestStack { store, posts, users }
}

/// A unique registration; `tag` must be a valid username fragment.
pub fn registration(tag: &str) -> Registration {
    let n = SEQ.fetch_add(1, Ordering::Relaxed);
    Registration {
        username: format!("{tag}{n}"),
        email: format!("{tag}{n}@club.test"),
        password: "castle_long".into(),
        first_name: FirstName().fake(),
        last_name: LastName().fake(),
    }
}

/// Registers a member through the real service and returns the account
/// with its bearer token.
pub async fn member(stack: &TestStack, tag: &str) -> (User, String) {
    stack
        .users
        .register(registration(tag))
        .await
        .unwrap_or_else(|err| panic!("registering {tag}: {err}"))
}

/// Flips an account to admin directly in the store.
pub async fn promote(stack: &TestStack, user: &mut User) {
    user.role = domains::Role::Admin;
    domains::UserRepo::update(stack.store.as_ref(), user)
        .await
        .unwrap_or_else(|err| panic!("promoting {}: {err}", user.username));
}

pub fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.into(),
        body: format!("{title}, annotated for the club bulletin."),
        category: None,
        tags: Vec::new(),
    }
}

pub fn png_upload() -> ImageUpload {
    ImageUpload {
        data: Bytes::from_static(b"\x89PNG\r\n\x1a\nfake"),
        content_type: mime::IMAGE_PNG,
    }
}
