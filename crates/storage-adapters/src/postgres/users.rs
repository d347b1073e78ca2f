//! Postgres `UserRepo`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domains::{DomainError, DomainResult, Page, Role, User, UserRepo};

use super::{like_pattern, map_err};

pub struct PgUserRepo {
    pool: PgPool,
}

impl PgUserRepo {
    pub fn new(pool: PgPool) -> Self {
        PgUserRepo { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    bio: String,
    avatar_url: Option<String>,
    rating: Option<i32>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            rating: row.rating,
            role: Role::from_db(&row.role),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, user: &User) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO users \
                 (id, username, email, password_hash, first_name, last_name, \
                  bio, avatar_url, rating, role, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(user.rating)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DomainResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, first_name, last_name, \
                    bio, avatar_url, rating, role, is_active, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, first_name, last_name, \
                    bio, avatar_url, rating, role, is_active, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(User::from))
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, first_name, last_name, \
                    bio, avatar_url, rating, role, is_active, created_at, updated_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(User::from))
    }

    async fn update(&self, user: &User) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE users SET \
                 first_name = $2, last_name = $3, bio = $4, avatar_url = $5, \
                 rating = $6, role = $7, is_active = $8, password_hash = $9, \
                 updated_at = $10 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(user.rating)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("User"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("User"));
        }
        Ok(())
    }

    async fn search<'a>(
        &self,
        term: Option<&'a str>,
        page: Page,
    ) -> DomainResult<(Vec<User>, u64)> {
        let pattern = term.map(like_pattern);
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, first_name, last_name, \
                    bio, avatar_url, rating, role, is_active, created_at, updated_at \
             FROM users \
             WHERE $1::text IS NULL \
                OR username ILIKE $1 OR email ILIKE $1 \
                OR first_name ILIKE $1 OR last_name ILIKE $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(pattern.as_deref())
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users \
             WHERE $1::text IS NULL \
                OR username ILIKE $1 OR email ILIKE $1 \
                OR first_name ILIKE $1 OR last_name ILIKE $1",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        Ok((rows.into_iter().map(User::from).collect(), total as u64))
    }
}
