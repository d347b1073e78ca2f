//! Bootstraps the first admin account.
//!
//! Reads `DATABASE_URL` and the `ADMIN_*` variables from the environment
//! (or a `.env` file) and inserts one active admin row. Safe to run
//! repeatedly: if the username or email is already taken, nothing changes.

use anyhow::Context;
use auth_adapters::ArgonHasher;
use domains::PasswordHasher;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let email = std::env::var("ADMIN_EMAIL").context("ADMIN_EMAIL is not set")?;
    let password = std::env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD is not set")?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("connecting to postgres")?;

    let hash = ArgonHasher::default()
        .hash(&password)
        .await
        .context("hashing the admin password")?;

    let result = sqlx::query(
        "INSERT INTO users \
           (id, username, email, password_hash, first_name, last_name, \
            role, is_active, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, 'Club', 'Admin', 'admin', TRUE, now(), now()) \
         ON CONFLICT DO NOTHING",
    )
    .bind(Uuid::now_v7())
    .bind(&username)
    .bind(&email)
    .bind(&hash)
    .execute(&pool)
    .await
    .context("inserting the admin row")?;

    if result.rows_affected() == 1 {
        println!("admin account '{username}' created");
    } else {
        println!("admin account '{username}' already exists, nothing to do");
    }
    Ok(())
}
