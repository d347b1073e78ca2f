//! HTTP request counters and the Prometheus exposition endpoint.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use domains::DomainError;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

use super::error::ApiError;
use super::AppState;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RequestLabels {
    method: String,
    /// Route template, not the raw path, to keep cardinality bounded.
    route: String,
    status: u32,
}

/// Request counters shared through [`AppState`].
#[derive(Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    requests: Family<RequestLabels, Counter>,
}

impl Telemetry {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let requests = Family::<RequestLabels, Counter>::default();
        registry.register("http_requests", "Handled HTTP requests", requests.clone());
        Telemetry {
            registry: Arc::new(registry),
            requests,
        }
    }

    fn observe(&self, method: String, route: String, status: u32) {
        self.requests
            .get_or_create(&RequestLabels {
                method,
                route,
                status,
            })
            .inc();
    }

    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Route-level middleware recording one counter increment per request.
pub(crate) async fn track(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let response = next.run(request).await;
    state
        .telemetry()
        .observe(method, route, u32::from(response.status().as_u16()));
    response
}

/// `GET /metrics` in the Prometheus text format.
pub(crate) async fn serve(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.telemetry().render().map_err(DomainError::upstream)?;
    Ok((
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_output_carries_the_counter_and_labels() {
        let telemetry = Telemetry::new();
        telemetry.observe("GET".into(), "/api/posts".into(), 200);
        telemetry.observe("GET".into(), "/api/posts".into(), 200);
        telemetry.observe("POST".into(), "/api/posts".into(), 201);

        let text = telemetry.render().unwrap();
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("route=\"/api/posts\""));
        assert!(text.contains("status=\"200\"} 2"));
    }
}
