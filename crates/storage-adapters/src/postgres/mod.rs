//! Postgres repositories behind the `db-postgres` feature.

mod posts;
mod users;

pub use posts::PgPostRepo;
pub use users::PgUserRepo;

use domains::{DomainError, DomainResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Opens a bounded connection pool.
pub async fn connect(url: &str, max_connections: u32) -> DomainResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(DomainError::upstream)
}

/// Applies the embedded migrations.
pub async fn migrate(pool: &PgPool) -> DomainResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DomainError::upstream)
}

/// Maps driver errors into the domain taxonomy. Unique violations become
/// field-level validation errors keyed by constraint name; foreign-key
/// violations surface as the absence of the parent row.
fn map_err(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            match db.constraint() {
                Some("users_email_key") => {
                    return DomainError::validation("email", "Email already registered")
                }
                Some("users_username_key") => {
                    return DomainError::validation("username", "Username already taken")
                }
                _ => {}
            }
        } else if matches!(db.kind(), sqlx::error::ErrorKind::ForeignKeyViolation) {
            let noun = match db.constraint() {
                Some(name) if name.contains("author") || name.contains("user") => "User",
                _ => "Post",
            };
            return DomainError::NotFound(noun);
        }
    }
    DomainError::upstream(err)
}

/// Wraps a search term for ILIKE, escaping the pattern metacharacters so
/// user input always matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
