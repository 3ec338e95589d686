//! Shared helpers: an in-memory app driven through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use api_adapters::{router, AppState};
use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use services::Services;
use storage_adapters::MemoryStore;
use tower::ServiceExt;

pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            router: router(AppState::new(Services::from_store(store))),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(http::Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(http::Method::POST)
                .uri(uri)
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn create_user(&self, nickname: &str) -> Value {
        let (status, body) = self
            .post(
                &format!("/api/user/{nickname}/create"),
                json!({
                    "fullname": format!("{nickname} full"),
                    "about": "",
                    "email": format!("{nickname}@example.org"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "creating user {nickname}: {body}");
        body
    }

    pub async fn create_forum(&self, slug: &str, owner: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/forum/create",
                json!({ "slug": slug, "title": format!("Forum {slug}"), "user": owner }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "creating forum {slug}: {body}");
        body
    }

    pub async fn create_thread(&self, forum: &str, author: &str, slug: Option<&str>) -> Value {
        let mut draft = json!({
            "title": "A thread",
            "author": author,
            "message": "Opening message",
        });
        if let Some(slug) = slug {
            draft["slug"] = json!(slug);
        }
        let (status, body) = self.post(&format!("/api/forum/{forum}/create"), draft).await;
        assert_eq!(status, StatusCode::CREATED, "creating thread in {forum}: {body}");
        body
    }

    /// Posts a batch to `/thread/{thread}/create`.
    pub async fn create_posts(&self, thread: &str, drafts: Value) -> (StatusCode, Value) {
        self.post(&format!("/api/thread/{thread}/create"), drafts).await
    }

    /// A user, a forum and a thread owned by that user; returns the thread id.
    pub async fn with_thread(&self) -> i64 {
        self.create_user("alice").await;
        self.create_forum("rust", "alice").await;
        thread_id(&self.create_thread("rust", "alice", None).await)
    }
}

pub fn thread_id(thread: &Value) -> i64 {
    thread["id"].as_i64().unwrap()
}

pub fn ids(posts: &Value) -> Vec<i64> {
    posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

pub fn draft(author: &str, message: &str, parent: i64) -> Value {
    json!({ "author": author, "message": message, "parent": parent })
}
