//! The axum surface.
//!
//! [`router`] assembles the whole HTTP tree: `/api/{auth,posts,users}`,
//! the health probe, and `/metrics`. Handlers translate wire shapes and
//! delegate every rule to the services; nothing here reads or writes a
//! store directly.

pub mod auth;
pub mod dto;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod posts;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::Utc;
use services::{PostService, UserService};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use dto::{HealthBody, MessageBody};
use metrics::Telemetry;

/// Cap for the plain JSON endpoints.
pub(crate) const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;
/// Five images of five MiB each, plus the text fields.
pub(crate) const UPLOAD_BODY_LIMIT: usize = 27 * 1024 * 1024;
/// One avatar of at most two MiB.
pub(crate) const AVATAR_BODY_LIMIT: usize = 3 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    posts: PostService,
    users: UserService,
    telemetry: Telemetry,
}

impl AppState {
    pub fn new(posts: PostService, users: UserService) -> Self {
        AppState {
            posts,
            users,
            telemetry: Telemetry::new(),
        }
    }

    pub(crate) fn posts(&self) -> &PostService {
        &self.posts
    }

    pub(crate) fn users(&self) -> &UserService {
        &self.users
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

/// Builds the full application router.
///
/// `allowed_origin` pins CORS to one origin with credentials; `None`
/// falls back to a permissive policy for local development.
pub fn router(state: AppState, allowed_origin: Option<HeaderValue>) -> Router {
    let cors = match allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    };

    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/posts", posts::routes())
        .nest("/users", users::routes())
        .route("/health", get(health));

    Router::new()
        .nest("/api", api)
        .route("/metrics", get(metrics::serve))
        // route_layer runs after matching, so the counter sees the route
        // template instead of the raw path.
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            metrics::track,
        ))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT)),
        )
        .with_state(state)
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "OK",
        message: "Chess club API is running",
        timestamp: Utc::now(),
    })
}

async fn not_found() -> (StatusCode, Json<MessageBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(MessageBody {
            message: "Route not found",
        }),
    )
}
