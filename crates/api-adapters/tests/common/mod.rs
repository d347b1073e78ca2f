#![allow(dead_code)]

use std::sync::Arc;

use api_adapters::web::{router, AppState};
use auth_adapters::{ArgonHasher, JwtTokens};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use domains::ports::MockMediaStorage;
use domains::{Category, Post, PostRepo, Role, StoredImage, User, UserRepo};
use secrecy::SecretString;
use serde_json::{json, Value};
use services::{PostService, UserService};
use storage_adapters::mem::MemStore;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemStore>,
}

/// The full stack over the in-memory store, with an always-succeeding
/// media mock keyed by folder.
pub fn test_app() -> TestApp {
    let mut media = MockMediaStorage::new();
    media.expect_upload().returning(|_, folder, _| {
        let key = format!("{folder}/aa/bb/upload.png");
        Ok(StoredImage {
            url: format!("http://media.test/{key}"),
            storage_key: key,
        })
    });
    media.expect_delete().returning(|_| Ok(()));
    test_app_with_media(media)
}

/// Same stack with caller-provided media expectations.
pub fn test_app_with_media(media: MockMediaStorage) -> TestApp {
    let store = Arc::new(MemStore::default());
    let media = Arc::new(media);
    let posts = PostService::new(store.clone(), store.clone(), media.clone());
    let users = UserService::new(
        store.clone(),
        store.clone(),
        media,
        Arc::new(ArgonHasher::default()),
        Arc::new(JwtTokens::new(&SecretString::from("route-test-secret"))),
    );
    TestApp {
        app: router(AppState::new(posts, users), None),
        store,
    }
}

/// Sends one request through the router and decodes the JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub struct FormFile<'a> {
    pub name: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

/// Builds a multipart/form-data request by hand.
pub fn multipart_request(
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    files: &[FormFile<'_>],
) -> Request<Body> {
    let boundary = "route-test-boundary-4Kq9mX";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.name, file.filename, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Registers an account over the API and returns `(id, token)`.
pub async fn register(app: &Router, username: &str, email: &str) -> (Uuid, String) {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({
                "username": username,
                "email": email,
                "password": "knight-to-f3",
                "firstName": "Test",
                "lastName": "Player",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    (id, token)
}

/// Flips an account to admin directly in the store, then issues a fresh
/// login-equivalent identity by reusing the existing token (role is read
/// per request, so no new token is needed).
pub async fn promote_to_admin(store: &MemStore, id: Uuid) {
    let mut user = UserRepo::find(store, id).await.unwrap().unwrap();
    user.role = Role::Admin;
    UserRepo::update(store, &user).await.unwrap();
}

/// Inserts a published post directly, bypassing the upload path.
pub async fn seed_post(store: &MemStore, author: &User, title: &str, minutes_ago: i64) -> Post {
    let created = Utc::now() - Duration::minutes(minutes_ago);
    let post = Post {
        id: Uuid::now_v7(),
        author_id: author.id,
        title: title.into(),
        body: "A quiet positional struggle.".into(),
        category: Category::General,
        tags: Vec::new(),
        images: Vec::new(),
        is_published: true,
        is_pinned: false,
        created_at: created,
        updated_at: created,
    };
    PostRepo::insert(store, &post).await.unwrap();
    post
}

pub async fn stored_user(store: &MemStore, id: Uuid) -> User {
    UserRepo::find(store, id).await.unwrap().unwrap()
}
