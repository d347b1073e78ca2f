//! The chess club API server.
//!
//! Wires the feature-selected adapters into the service layer, builds the
//! Axum router, and serves until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::web::{router, AppState};
use auth_adapters::{ArgonHasher, JwtTokens};
use axum::http::HeaderValue;
use domains::{MediaStorage, PostRepo, UserRepo};
use services::{PostService, UserService};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(not(all(feature = "web-axum", feature = "auth-jwt")))]
compile_error!("rook needs the web-axum and auth-jwt features");
#[cfg(not(any(feature = "media-local", feature = "media-s3")))]
compile_error!("rook needs an image store: enable media-local or media-s3");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rook=info,api_adapters=info,services=info".into()),
        )
        .init();

    let config = configs::AppConfig::load().context("loading configuration")?;

    let (users, posts) = repositories(&config).await?;
    let media = media_store(&config).await;
    let hasher = Arc::new(ArgonHasher::default());
    let tokens = Arc::new(JwtTokens::new(&config.auth.jwt_secret));

    let post_service = PostService::new(posts.clone(), users.clone(), media.clone());
    let user_service = UserService::new(users, posts, media, hasher, tokens);

    let origin = config
        .http
        .cors_origin
        .as_deref()
        .map(|value| value.parse::<HeaderValue>())
        .transpose()
        .context("parsing http.cors_origin")?;

    let app = router(AppState::new(post_service, user_service), origin);
    #[cfg(all(feature = "media-local", not(feature = "media-s3")))]
    let app = app.nest_service(
        config.media.local.url_prefix.as_str(),
        tower_http::services::ServeDir::new(&config.media.local.root),
    );

    let address = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;
    info!("server stopped");
    Ok(())
}

#[cfg(feature = "db-postgres")]
async fn repositories(
    config: &configs::AppConfig,
) -> anyhow::Result<(Arc<dyn UserRepo>, Arc<dyn PostRepo>)> {
    use secrecy::ExposeSecret;
    use storage_adapters::postgres::{self, PgPostRepo, PgUserRepo};

    let pool = postgres::connect(
        config.database.url.expose_secret(),
        config.database.max_connections,
    )
    .await
    .context("connecting to postgres")?;
    if config.database.run_migrations {
        postgres::migrate(&pool).await.context("running migrations")?;
        info!("migrations applied");
    }
    Ok((
        Arc::new(PgUserRepo::new(pool.clone())),
        Arc::new(PgPostRepo::new(pool)),
    ))
}

/// Database-free mode for local hacking: everything lives in one
/// in-memory store and vanishes on shutdown.
#[cfg(not(feature = "db-postgres"))]
async fn repositories(
    _config: &configs::AppConfig,
) -> anyhow::Result<(Arc<dyn UserRepo>, Arc<dyn PostRepo>)> {
    use storage_adapters::mem::MemStore;

    info!("db-postgres disabled, running on the in-memory store");
    let store = Arc::new(MemStore::new());
    Ok((store.clone(), store))
}

#[cfg(feature = "media-s3")]
async fn media_store(config: &configs::AppConfig) -> Arc<dyn MediaStorage> {
    use storage_adapters::media::S3MediaStore;

    Arc::new(S3MediaStore::from_env(&config.media.s3.bucket, &config.media.s3.public_base).await)
}

#[cfg(all(feature = "media-local", not(feature = "media-s3")))]
async fn media_store(config: &configs::AppConfig) -> Arc<dyn MediaStorage> {
    use storage_adapters::media::LocalMediaStore;

    Arc::new(LocalMediaStore::new(
        &config.media.local.root,
        &config.media.local.url_prefix,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
