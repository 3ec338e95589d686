//! Cross-cutting behaviour of the router: error bodies, request ids, metrics.

use std::sync::Arc;

use api_adapters::{router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use services::Services;
use storage_adapters::MemoryStore;
use tower::ServiceExt;

fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    router(AppState::new(Services::from_store(store)))
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn unknown_user_is_404_with_message_body() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/user/ghost/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(json["message"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/service/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn malformed_json_is_400_with_message_body() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/forum/create")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn metrics_count_served_requests() {
    let app = app();
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/api/service/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains(r#"forum_http_requests_total{method="GET",status="200"} 1"#));
}
