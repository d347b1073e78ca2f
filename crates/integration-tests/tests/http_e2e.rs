//! End-to-end over a real socket: axum serves on an ephemeral port and a
//! reqwest client drives it, including a genuine multipart upload.

use api_adapters::web::{router, AppState};
use integration_tests::stack;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

async fn serve() -> String {
    let stack = stack();
    let app = router(AppState::new(stack.posts, stack.users), None);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("binding an ephemeral port");
    let addr = listener.local_addr().expect("reading the bound address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serving");
    });
    format!("http://{addr}")
}

async fn register(client: &Client, base: &str, username: &str) -> String {
    let response = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@club.test"),
            "password": "knight-to-f3",
            "firstName": "Wire",
            "lastName": "Tester",
        }))
        .send()
        .await
        .expect("register request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("register body");
    body["token"].as_str().expect("token").to_owned()
}

#[tokio::test]
async fn multipart_post_creation_over_the_wire() {
    let base = serve().await;
    let client = Client::new();
    let author = register(&client, &base, "wire_author").await;

    let form = Form::new()
        .text("title", "Simul night report")
        .text("content", "Twenty boards, two draws, one loss on board five.")
        .text("category", "tournament")
        .text("tags", "simul")
        .part(
            "images",
            Part::bytes(PNG.to_vec())
                .file_name("boards.png")
                .mime_str("image/png")
                .expect("png part"),
        );
    let response = client
        .post(format!("{base}/api/posts"))
        .bearer_auth(&author)
        .multipart(form)
        .send()
        .await
        .expect("create request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("create body");
    let post = &body["post"];
    assert_eq!(post["category"], "tournament");
    let image = &post["images"][0];
    assert!(image["url"]
        .as_str()
        .is_some_and(|url| url.starts_with("http://media.test/posts/")));
    assert!(image.get("storageKey").is_none());
    let post_id = post["id"].as_str().expect("post id").to_owned();

    let listing: Value = client
        .get(format!("{base}/api/posts"))
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    assert_eq!(listing["pagination"]["totalPosts"], 1);

    // A second account reads the post; the viewer set admits it once.
    let reader = register(&client, &base, "wire_reader").await;
    for _ in 0..2 {
        let detail: Value = client
            .get(format!("{base}/api/posts/{post_id}"))
            .bearer_auth(&reader)
            .send()
            .await
            .expect("detail request")
            .json()
            .await
            .expect("detail body");
        assert_eq!(detail["post"]["viewCount"], 1);
    }

    // The listing carries the per-requester flag.
    let listing: Value = client
        .get(format!("{base}/api/posts"))
        .bearer_auth(&reader)
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    assert_eq!(listing["posts"][0]["viewedByMe"], true);
}

#[tokio::test]
async fn avatar_upload_over_the_wire() {
    let base = serve().await;
    let client = Client::new();
    let token = register(&client, &base, "wire_avatar").await;

    let form = Form::new().part(
        "profilePicture",
        Part::bytes(PNG.to_vec())
            .file_name("me.png")
            .mime_str("image/png")
            .expect("png part"),
    );
    let response = client
        .post(format!("{base}/api/auth/profile-picture"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("avatar request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("avatar body");
    assert_eq!(body["message"], "Profile picture updated successfully.");
    assert!(body["user"]["profilePicture"]
        .as_str()
        .is_some_and(|url| url.starts_with("http://media.test/profiles/")));
}

#[tokio::test]
async fn anonymous_writes_are_refused_over_the_wire() {
    let base = serve().await;
    let client = Client::new();

    let response = client
        .post(format!("{base}/api/posts"))
        .multipart(Form::new().text("title", "Drive-by"))
        .send()
        .await
        .expect("unauthenticated request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("error body");
    assert_eq!(body["message"], "Authentication required");
}
