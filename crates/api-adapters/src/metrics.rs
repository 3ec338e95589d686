//! Prometheus metrics served at `/metrics`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    pub status: String,
}

pub struct Metrics {
    registry: Registry,
    requests: Family<RequestLabels, Counter>,
    posts_created: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("forum");

        let requests = Family::<RequestLabels, Counter>::default();
        registry.register(
            "http_requests",
            "HTTP requests by method and response status",
            requests.clone(),
        );

        let posts_created = Counter::default();
        registry.register(
            "posts_created",
            "Posts persisted through batch creation",
            posts_created.clone(),
        );

        Self {
            registry,
            requests,
            posts_created,
        }
    }

    pub fn record_request(&self, method: &str, status: StatusCode) {
        self.requests
            .get_or_create(&RequestLabels {
                method: method.to_owned(),
                status: status.as_u16().to_string(),
            })
            .inc();
    }

    pub fn record_posts_created(&self, count: usize) {
        self.posts_created.inc_by(count as u64);
    }

    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts every response by method and status.
pub async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics.record_request(&method, response.status());
    response
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_recorded_counters() {
        let metrics = Metrics::new();
        metrics.record_request("GET", StatusCode::OK);
        metrics.record_request("GET", StatusCode::OK);
        metrics.record_posts_created(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"forum_http_requests_total{method="GET",status="200"} 2"#));
        assert!(text.contains("forum_posts_created_total 3"));
    }
}
