//! Layered application configuration.
//!
//! Settings load in three passes: `config/default.toml`, then an optional
//! `config/{RUN_ENV}.toml` overlay, then environment variables prefixed
//! with `ROOK__` (double underscore nests sections, so
//! `ROOK__HTTP__PORT=9000` overrides `http.port`). A `.env` file in the
//! working directory is folded into the environment before the passes run.

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    #[cfg(feature = "auth-jwt")]
    pub auth: AuthConfig,
    #[cfg(feature = "db-postgres")]
    pub database: DatabaseConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Exact origin allowed by CORS. Absent means permissive, which is
    /// only appropriate for local development.
    pub cors_origin: Option<String>,
}

#[cfg(feature = "auth-jwt")]
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret. The checked-in default must be overridden
    /// anywhere that is not a developer machine.
    pub jwt_secret: SecretString,
}

#[cfg(feature = "db-postgres")]
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection string, password included, so it stays out of logs.
    pub url: SecretString,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[cfg(feature = "media-local")]
    pub local: LocalMediaConfig,
    #[cfg(feature = "media-s3")]
    pub s3: S3MediaConfig,
}

#[cfg(feature = "media-local")]
#[derive(Debug, Clone, Deserialize)]
pub struct LocalMediaConfig {
    /// Directory uploaded files land in, created on demand.
    pub root: String,
    /// Public path the HTTP layer serves that directory under.
    pub url_prefix: String,
}

#[cfg(feature = "media-s3")]
#[derive(Debug, Clone, Deserialize)]
pub struct S3MediaConfig {
    pub bucket: String,
    /// Base URL clients fetch objects from, typically a CDN distribution.
    pub public_base: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());
        tracing::debug!(env = %run_env, "loading configuration");

        let settings = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{run_env}")).required(false))
            .add_source(
                Environment::with_prefix("ROOK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const DOC: &str = r#"
        [http]
        host = "127.0.0.1"
        port = 9000
        cors_origin = "http://localhost:3000"

        [auth]
        jwt_secret = "test-secret"

        [database]
        url = "postgres://postgres@localhost/chess_club"
        max_connections = 4
        run_migrations = true

        [media.local]
        root = "./data/uploads"
        url_prefix = "/uploads"

        [media.s3]
        bucket = "club-media"
        public_base = "https://cdn.example.test"
    "#;

    fn parse(doc: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(doc, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn full_document_deserializes() {
        let config = parse(DOC);
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.http.cors_origin.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn cors_origin_is_optional() {
        let doc = DOC.replace("cors_origin = \"http://localhost:3000\"", "");
        let config = parse(&doc);
        assert!(config.http.cors_origin.is_none());
    }
}
