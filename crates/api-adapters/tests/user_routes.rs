//! `/api/users` through the full router over the in-memory store.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn directory_is_for_admins_only() {
    let harness = test_app();
    let (_, member_token) = register(&harness.app, "rank_and_file", "member@club.test").await;
    let (admin_id, admin_token) = register(&harness.app, "secretary", "secretary@club.test").await;
    promote_to_admin(&harness.store, admin_id).await;

    let (status, body) = send(&harness.app, get("/api/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication required");

    let (status, body) = send(&harness.app, get("/api/users", Some(&member_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Admin access required");

    let (status, body) = send(&harness.app, get("/api/users", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["totalPages"], 1);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &harness.app,
        get("/api/users?search=rank_and_file", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["users"][0]["username"], "rank_and_file");
}

#[tokio::test]
async fn directory_paginates_with_the_flat_shape() {
    let harness = test_app();
    let (admin_id, admin_token) = register(&harness.app, "registrar", "registrar@club.test").await;
    promote_to_admin(&harness.store, admin_id).await;
    for i in 0..6 {
        register(
            &harness.app,
            &format!("roster{i}"),
            &format!("roster{i}@club.test"),
        )
        .await;
    }

    let (status, body) = send(
        &harness.app,
        get("/api/users?page=2&limit=3", Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 3);
    assert_eq!(body["total"], 7);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["currentPage"], 2);
}

#[tokio::test]
async fn profile_carries_the_five_most_recent_posts() {
    let harness = test_app();
    let (author_id, _) = register(&harness.app, "prolific", "prolific@club.test").await;
    let author = stored_user(&harness.store, author_id).await;
    for i in 0..7 {
        seed_post(&harness.store, &author, &format!("Column {i}"), i).await;
    }

    let (status, body) = send(&harness.app, get(&format!("/api/users/{author_id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "prolific");
    assert!(body["user"].get("password").is_none());
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 5);
    assert_eq!(posts[0]["title"], "Column 0");
    assert_eq!(posts[4]["title"], "Column 4");
}

#[tokio::test]
async fn author_posts_listing_paginates_flat() {
    let harness = test_app();
    let (author_id, _) = register(&harness.app, "serialist", "serialist@club.test").await;
    let author = stored_user(&harness.store, author_id).await;
    for i in 0..7 {
        seed_post(&harness.store, &author, &format!("Episode {i}"), i).await;
    }

    let (status, body) = send(
        &harness.app,
        get(&format!("/api/users/{author_id}/posts?page=2&limit=3"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 3);
    assert_eq!(posts[0]["title"], "Episode 3");
    assert_eq!(body["total"], 7);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["currentPage"], 2);
}

#[tokio::test]
async fn unknown_profiles_are_not_found() {
    let harness = test_app();
    let (status, body) = send(
        &harness.app,
        get("/api/users/00000000-0000-7000-8000-000000000000", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn inactive_profiles_vanish_except_for_admins() {
    let harness = test_app();
    let (member_id, _) = register(&harness.app, "invisible", "invisible@club.test").await;
    let (admin_id, admin_token) = register(&harness.app, "overseer", "overseer@club.test").await;
    promote_to_admin(&harness.store, admin_id).await;
    let profile_uri = format!("/api/users/{member_id}");

    let (status, body) = send(
        &harness.app,
        json_request(
            Method::PUT,
            &format!("/api/users/{member_id}/status"),
            Some(&admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isActive"], false);

    let (status, body) = send(&harness.app, get(&profile_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, body) = send(&harness.app, get(&profile_uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isActive"], false);

    // Toggling again brings the account back for everyone.
    let (_, body) = send(
        &harness.app,
        json_request(
            Method::PUT,
            &format!("/api/users/{member_id}/status"),
            Some(&admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(body["message"], "User activated");
    let (status, _) = send(&harness.app, get(&profile_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn members_update_themselves_but_cannot_take_a_role() {
    let harness = test_app();
    let (member_id, member_token) = register(&harness.app, "climber", "climber@club.test").await;
    let (other_id, _) = register(&harness.app, "bystander", "bystander@club.test").await;

    let (status, _) = send(
        &harness.app,
        json_request(
            Method::PUT,
            &format!("/api/users/{other_id}"),
            Some(&member_token),
            json!({"bio": "rewritten"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A role field from a non-admin is dropped, not rejected.
    let (status, body) = send(
        &harness.app,
        json_request(
            Method::PUT,
            &format!("/api/users/{member_id}"),
            Some(&member_token),
            json!({"bio": "Still climbing", "role": "admin"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["user"]["bio"], "Still climbing");
    assert_eq!(body["user"]["role"], "member");
}

#[tokio::test]
async fn admins_assign_roles_and_bad_roles_bounce() {
    let harness = test_app();
    let (member_id, _) = register(&harness.app, "promotee", "promotee@club.test").await;
    let (admin_id, admin_token) = register(&harness.app, "president", "president@club.test").await;
    promote_to_admin(&harness.store, admin_id).await;
    let uri = format!("/api/users/{member_id}");

    let (status, body) = send(
        &harness.app,
        json_request(Method::PUT, &uri, Some(&admin_token), json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");

    let (status, body) = send(
        &harness.app,
        json_request(Method::PUT, &uri, Some(&admin_token), json!({"role": "owner"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "role");
}

#[tokio::test]
async fn admins_cannot_bench_or_delete_themselves() {
    let harness = test_app();
    let (admin_id, admin_token) = register(&harness.app, "lonely_top", "lonely@club.test").await;
    promote_to_admin(&harness.store, admin_id).await;

    let (status, body) = send(
        &harness.app,
        json_request(
            Method::PUT,
            &format!("/api/users/{admin_id}/status"),
            Some(&admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot deactivate your own account");

    let (status, body) = send(
        &harness.app,
        json_request(
            Method::DELETE,
            &format!("/api/users/{admin_id}"),
            Some(&admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete your own account");
}

#[tokio::test]
async fn deleting_a_user_takes_their_posts_along() {
    let harness = test_app();
    let (member_id, member_token) = register(&harness.app, "departing", "departing@club.test").await;
    let (admin_id, admin_token) = register(&harness.app, "cleanup", "cleanup@club.test").await;
    promote_to_admin(&harness.store, admin_id).await;

    let (_, body) = send(
        &harness.app,
        multipart_request(
            "/api/posts",
            Some(&member_token),
            &[("title", "Farewell post"), ("content", "Moving cities.")],
            &[FormFile {
                name: "images",
                filename: "wave.png",
                content_type: "image/png",
                data: b"\x89PNG\r\n\x1a\nfake",
            }],
        ),
    )
    .await;
    let post_uri = format!("/api/posts/{}", body["post"]["id"].as_str().unwrap());

    let (status, body) = send(
        &harness.app,
        json_request(
            Method::DELETE,
            &format!("/api/users/{member_id}"),
            Some(&admin_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, _) = send(&harness.app, get(&post_uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&harness.app, get(&format!("/api/users/{member_id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&harness.app, get("/api/posts", None)).await;
    assert_eq!(body["pagination"]["totalPosts"], 0);
}

#[tokio::test]
async fn member_deletion_requires_admin() {
    let harness = test_app();
    let (target_id, _) = register(&harness.app, "target", "target@club.test").await;
    let (_, member_token) = register(&harness.app, "vigilante", "vigilante@club.test").await;

    let (status, _) = send(
        &harness.app,
        json_request(
            Method::DELETE,
            &format!("/api/users/{target_id}"),
            Some(&member_token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
