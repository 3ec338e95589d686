//! # api-adapters
//!
//! HTTP surface of the forum. Everything lives behind the `web-axum`
//! feature; the router is mounted by the binary.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;

#[cfg(feature = "web-axum")]
pub use router::{router, AppState};

#[cfg(feature = "web-axum")]
mod router {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{Method, Request};
    use axum::middleware;
    use axum::routing::{get, post};
    use axum::Router;
    use services::Services;
    use tower::ServiceBuilder;
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
    use tower_http::trace::TraceLayer;

    use crate::handlers::{forums, posts, service, threads, users};
    use crate::metrics::{metrics_handler, track_requests, Metrics};

    /// State shared by every handler.
    #[derive(Clone)]
    pub struct AppState {
        pub services: Arc<Services>,
        pub metrics: Arc<Metrics>,
    }

    impl AppState {
        pub fn new(services: Services) -> Self {
            Self {
                services: Arc::new(services),
                metrics: Arc::new(Metrics::new()),
            }
        }
    }

    impl FromRef<AppState> for Arc<Metrics> {
        fn from_ref(state: &AppState) -> Self {
            state.metrics.clone()
        }
    }

    /// Builds the full router: the `/api` routes, `/metrics`, and the
    /// request-id, tracing, CORS and request-counting layers.
    pub fn router(state: AppState) -> Router {
        let api = Router::new()
            .route("/user/{nickname}/create", post(users::create))
            .route("/user/{nickname}/profile", get(users::profile).post(users::update))
            .route("/forum/create", post(forums::create))
            .route("/forum/{slug}/details", get(forums::details))
            .route("/forum/{slug}/create", post(threads::create))
            .route("/forum/{slug}/threads", get(forums::threads))
            .route("/forum/{slug}/users", get(forums::users))
            .route("/post/{id}/details", get(posts::details).post(posts::update))
            .route("/thread/{slug_or_id}/create", post(posts::create))
            .route("/thread/{slug_or_id}/details", get(threads::details).post(threads::update))
            .route("/thread/{slug_or_id}/posts", get(posts::list))
            .route("/thread/{slug_or_id}/vote", post(threads::vote))
            .route("/service/status", get(service::status))
            .route("/service/clear", post(service::clear));

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .max_age(Duration::from_secs(3600));

        Router::new()
            .nest("/api", api)
            .route("/metrics", get(metrics_handler))
            .layer(middleware::from_fn_with_state(state.metrics.clone(), track_requests))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        let request_id = req
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors),
            )
    }
}
