mod common;

use axum::http::StatusCode;
use common::{draft, TestApp};
use serde_json::json;

#[tokio::test]
async fn forum_owner_takes_canonical_nickname() {
    let app = TestApp::new();
    app.create_user("Alice").await;
    let (status, forum) = app
        .post(
            "/api/forum/create",
            json!({ "slug": "rust", "title": "Rust", "user": "alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(forum["user"], json!("Alice"));
    assert_eq!(forum["threads"], json!(0));
}

#[tokio::test]
async fn duplicate_slug_returns_existing_forum() {
    let app = TestApp::new();
    app.create_user("alice").await;
    app.create_forum("rust", "alice").await;

    let (status, existing) = app
        .post(
            "/api/forum/create",
            json!({ "slug": "RUST", "title": "Other", "user": "alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(existing["slug"], json!("rust"));
    assert_eq!(existing["title"], json!("Forum rust"));
}

#[tokio::test]
async fn unknown_owner_or_forum_is_404() {
    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/api/forum/create",
            json!({ "slug": "rust", "title": "Rust", "user": "ghost" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/forum/rust/details").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get("/api/forum/rust/threads").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn threads_are_listed_by_creation_time() {
    let app = TestApp::new();
    app.create_user("alice").await;
    app.create_forum("rust", "alice").await;
    for (slug, created) in [
        ("first", "2024-01-01T00:00:00Z"),
        ("second", "2024-02-01T00:00:00Z"),
        ("third", "2024-03-01T00:00:00Z"),
    ] {
        let (status, _) = app
            .post(
                "/api/forum/rust/create",
                json!({
                    "title": slug,
                    "author": "alice",
                    "message": "m",
                    "slug": slug,
                    "created": created,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let slugs = |threads: &serde_json::Value| -> Vec<String> {
        threads
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["slug"].as_str().unwrap().to_owned())
            .collect()
    };

    let (_, asc) = app.get("/api/forum/rust/threads?limit=2").await;
    assert_eq!(slugs(&asc), vec!["first", "second"]);

    let (_, since) = app
        .get("/api/forum/rust/threads?since=2024-02-01T00:00:00Z&desc=true")
        .await;
    assert_eq!(slugs(&since), vec!["second", "first"]);

    let (status, _) = app.get("/api/forum/rust/threads?since=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, forum) = app.get("/api/forum/RUST/details").await;
    assert_eq!(forum["threads"], json!(3));
}

#[tokio::test]
async fn forum_users_are_thread_and_post_authors() {
    let app = TestApp::new();
    for nickname in ["alice", "Bob", "carol", "dave"] {
        app.create_user(nickname).await;
    }
    app.create_forum("rust", "dave").await;
    app.create_thread("rust", "alice", Some("t")).await;
    app.create_posts("t", json!([draft("carol", "x", 0), draft("bob", "y", 0)]))
        .await;

    let nicknames = |users: &serde_json::Value| -> Vec<String> {
        users
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["nickname"].as_str().unwrap().to_owned())
            .collect()
    };

    let (status, all) = app.get("/api/forum/rust/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(nicknames(&all), vec!["alice", "Bob", "carol"]);

    let (_, after) = app.get("/api/forum/rust/users?since=alice&limit=1").await;
    assert_eq!(nicknames(&after), vec!["Bob"]);

    let (_, desc) = app.get("/api/forum/rust/users?desc=true&since=carol").await;
    assert_eq!(nicknames(&desc), vec!["Bob", "alice"]);
}
