//! Postgres `PostRepo`.
//!
//! Posts keep their images, comments, and viewer set in child tables with
//! `ON DELETE CASCADE`, so a post row delete is the single authoritative
//! step of post removal. Counts are computed per query, never stored.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domains::{
    AuthorCard, Category, Comment, CommentRecord, DomainError, DomainResult, Page, Post,
    PostDetail, PostImage, PostQuery, PostRecord, PostRepo,
};

use super::{like_pattern, map_err};

pub struct PgPostRepo {
    pool: PgPool,
}

impl PgPostRepo {
    pub fn new(pool: PgPool) -> Self {
        PgPostRepo { pool }
    }

    async fn images_for(&self, ids: &[Uuid]) -> DomainResult<HashMap<Uuid, Vec<PostImage>>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT post_id, url, storage_key, caption \
             FROM post_images WHERE post_id = ANY($1) \
             ORDER BY post_id, position",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let mut map: HashMap<Uuid, Vec<PostImage>> = HashMap::new();
        for row in rows {
            map.entry(row.post_id).or_default().push(PostImage {
                url: row.url,
                storage_key: row.storage_key,
                caption: row.caption,
            });
        }
        Ok(map)
    }

    async fn hydrate(&self, rows: Vec<ListedRow>) -> DomainResult<Vec<PostRecord>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut images = self.images_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let own = images.remove(&row.id).unwrap_or_default();
                row.into_record(own)
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    body: String,
    category: String,
    tags: Vec<String>,
    is_published: bool,
    is_pinned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_post(self, images: Vec<PostImage>) -> Post {
        Post {
            id: self.id,
            author_id: self.author_id,
            title: self.title,
            body: self.body,
            category: self.category.parse().unwrap_or(Category::General),
            tags: self.tags,
            images,
            is_published: self.is_published,
            is_pinned: self.is_pinned,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ListedRow {
    id: Uuid,
    author_id: Uuid,
    title: String,
    body: String,
    category: String,
    tags: Vec<String>,
    is_published: bool,
    is_pinned: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_first_name: String,
    author_last_name: String,
    author_avatar_url: Option<String>,
    author_bio: String,
    view_count: i64,
    comment_count: i64,
    viewed: bool,
}

impl ListedRow {
    fn into_record(self, images: Vec<PostImage>) -> PostRecord {
        PostRecord {
            author: AuthorCard {
                id: self.author_id,
                first_name: self.author_first_name,
                last_name: self.author_last_name,
                avatar_url: self.author_avatar_url,
                bio: self.author_bio,
            },
            post: Post {
                id: self.id,
                author_id: self.author_id,
                title: self.title,
                body: self.body,
                category: self.category.parse().unwrap_or(Category::General),
                tags: self.tags,
                images,
                is_published: self.is_published,
                is_pinned: self.is_pinned,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            view_count: self.view_count as u64,
            comment_count: self.comment_count as u64,
            viewed_by_requester: self.viewed,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    post_id: Uuid,
    url: String,
    storage_key: String,
    caption: String,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    author_id: Uuid,
    body: String,
    created_at: DateTime<Utc>,
    author_first_name: String,
    author_last_name: String,
    author_avatar_url: Option<String>,
    author_bio: String,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        CommentRecord {
            author: AuthorCard {
                id: row.author_id,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
                avatar_url: row.author_avatar_url,
                bio: row.author_bio,
            },
            comment: Comment {
                id: row.id,
                author_id: row.author_id,
                body: row.body,
                created_at: row.created_at,
            },
        }
    }
}

#[async_trait]
impl PostRepo for PgPostRepo {
    async fn insert(&self, post: &Post) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_err)?;
        sqlx::query(
            "INSERT INTO posts \
                 (id, author_id, title, body, category, tags, \
                  is_published, is_pinned, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.category.as_str())
        .bind(&post.tags)
        .bind(post.is_published)
        .bind(post.is_pinned)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        for (position, image) in post.images.iter().enumerate() {
            sqlx::query(
                "INSERT INTO post_images (post_id, position, url, storage_key, caption) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(post.id)
            .bind(position as i32)
            .bind(&image.url)
            .bind(&image.storage_key)
            .bind(&image.caption)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        }
        tx.commit().await.map_err(map_err)?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DomainResult<Option<PostDetail>> {
        let row = sqlx::query_as::<_, ListedRow>(
            "SELECT p.id, p.author_id, p.title, p.body, p.category, p.tags, \
                    p.is_published, p.is_pinned, p.created_at, p.updated_at, \
                    u.first_name AS author_first_name, u.last_name AS author_last_name, \
                    u.avatar_url AS author_avatar_url, u.bio AS author_bio, \
                    (SELECT COUNT(*) FROM post_viewers v WHERE v.post_id = p.id) AS view_count, \
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count, \
                    FALSE AS viewed \
             FROM posts p JOIN users u ON u.id = p.author_id \
             WHERE p.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let comments = sqlx::query_as::<_, CommentRow>(
            "SELECT c.id, c.author_id, c.body, c.created_at, \
                    u.first_name AS author_first_name, u.last_name AS author_last_name, \
                    u.avatar_url AS author_avatar_url, u.bio AS author_bio \
             FROM post_comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at, c.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let images = self
            .images_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        let record = row.into_record(images);
        Ok(Some(PostDetail {
            post: record.post,
            author: record.author,
            comments: comments.into_iter().map(CommentRecord::from).collect(),
            view_count: record.view_count,
        }))
    }

    async fn find_bare(&self, id: Uuid) -> DomainResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT id, author_id, title, body, category, tags, \
                    is_published, is_pinned, created_at, updated_at \
             FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let images = self
            .images_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(Some(row.into_post(images)))
    }

    async fn update(&self, post: &Post) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE posts SET \
                 title = $2, body = $3, category = $4, tags = $5, \
                 is_published = $6, is_pinned = $7, updated_at = $8 \
             WHERE id = $1",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.category.as_str())
        .bind(&post.tags)
        .bind(post.is_published)
        .bind(post.is_pinned)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("Post"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("Post"));
        }
        Ok(())
    }

    async fn list(
        &self,
        query: &PostQuery,
        page: Page,
        viewer: Option<Uuid>,
    ) -> DomainResult<(Vec<PostRecord>, u64)> {
        let category = query.category.map(Category::as_str);
        let pattern = query.search.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, ListedRow>(
            "SELECT p.id, p.author_id, p.title, p.body, p.category, p.tags, \
                    p.is_published, p.is_pinned, p.created_at, p.updated_at, \
                    u.first_name AS author_first_name, u.last_name AS author_last_name, \
                    u.avatar_url AS author_avatar_url, u.bio AS author_bio, \
                    (SELECT COUNT(*) FROM post_viewers v WHERE v.post_id = p.id) AS view_count, \
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count, \
                    EXISTS (SELECT 1 FROM post_viewers v \
                            WHERE v.post_id = p.id AND v.user_id = $3) AS viewed \
             FROM posts p JOIN users u ON u.id = p.author_id \
             WHERE p.is_published \
               AND ($1::text IS NULL OR p.category = $1) \
               AND ($2::text IS NULL \
                    OR p.title ILIKE $2 OR p.body ILIKE $2 \
                    OR EXISTS (SELECT 1 FROM unnest(p.tags) AS tag WHERE tag ILIKE $2)) \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $4 OFFSET $5",
        )
        .bind(category)
        .bind(pattern.as_deref())
        .bind(viewer)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts p \
             WHERE p.is_published \
               AND ($1::text IS NULL OR p.category = $1) \
               AND ($2::text IS NULL \
                    OR p.title ILIKE $2 OR p.body ILIKE $2 \
                    OR EXISTS (SELECT 1 FROM unnest(p.tags) AS tag WHERE tag ILIKE $2))",
        )
        .bind(category)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        Ok((self.hydrate(rows).await?, total as u64))
    }

    async fn list_pinned(&self, limit: u32) -> DomainResult<Vec<PostRecord>> {
        let rows = sqlx::query_as::<_, ListedRow>(
            "SELECT p.id, p.author_id, p.title, p.body, p.category, p.tags, \
                    p.is_published, p.is_pinned, p.created_at, p.updated_at, \
                    u.first_name AS author_first_name, u.last_name AS author_last_name, \
                    u.avatar_url AS author_avatar_url, u.bio AS author_bio, \
                    (SELECT COUNT(*) FROM post_viewers v WHERE v.post_id = p.id) AS view_count, \
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count, \
                    FALSE AS viewed \
             FROM posts p JOIN users u ON u.id = p.author_id \
             WHERE p.is_pinned AND p.is_published \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        self.hydrate(rows).await
    }

    async fn list_by_author(
        &self,
        author_id: Uuid,
        page: Page,
    ) -> DomainResult<(Vec<PostRecord>, u64)> {
        let rows = sqlx::query_as::<_, ListedRow>(
            "SELECT p.id, p.author_id, p.title, p.body, p.category, p.tags, \
                    p.is_published, p.is_pinned, p.created_at, p.updated_at, \
                    u.first_name AS author_first_name, u.last_name AS author_last_name, \
                    u.avatar_url AS author_avatar_url, u.bio AS author_bio, \
                    (SELECT COUNT(*) FROM post_viewers v WHERE v.post_id = p.id) AS view_count, \
                    (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count, \
                    FALSE AS viewed \
             FROM posts p JOIN users u ON u.id = p.author_id \
             WHERE p.author_id = $1 AND p.is_published \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(author_id)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE author_id = $1 AND is_published",
        )
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;

        Ok((self.hydrate(rows).await?, total as u64))
    }

    async fn register_view(&self, post_id: Uuid, viewer: Uuid) -> DomainResult<bool> {
        let result = sqlx::query(
            "INSERT INTO post_viewers (post_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(viewer)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn register_views(&self, post_ids: &[Uuid], viewer: Uuid) -> DomainResult<()> {
        if post_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO post_viewers (post_id, user_id) \
             SELECT t.post_id, $2 FROM unnest($1::uuid[]) AS t(post_id) \
             ON CONFLICT DO NOTHING",
        )
        .bind(post_ids)
        .bind(viewer)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn add_comment(&self, post_id: Uuid, comment: &Comment) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO post_comments (id, post_id, author_id, body, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(post_id)
        .bind(comment.author_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid) -> DomainResult<Option<Comment>> {
        #[derive(sqlx::FromRow)]
        struct BareCommentRow {
            id: Uuid,
            author_id: Uuid,
            body: String,
            created_at: DateTime<Utc>,
        }
        let row = sqlx::query_as::<_, BareCommentRow>(
            "SELECT id, author_id, body, created_at \
             FROM post_comments WHERE post_id = $1 AND id = $2",
        )
        .bind(post_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(row.map(|row| Comment {
            id: row.id,
            author_id: row.author_id,
            body: row.body,
            created_at: row.created_at,
        }))
    }

    async fn delete_comment(&self, post_id: Uuid, comment_id: Uuid) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM post_comments WHERE post_id = $1 AND id = $2")
            .bind(post_id)
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn images_by_author(&self, author_id: Uuid) -> DomainResult<Vec<PostImage>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT i.post_id, i.url, i.storage_key, i.caption \
             FROM post_images i JOIN posts p ON p.id = i.post_id \
             WHERE p.author_id = $1",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows
            .into_iter()
            .map(|row| PostImage {
                url: row.url,
                storage_key: row.storage_key,
                caption: row.caption,
            })
            .collect())
    }

    async fn delete_by_author(&self, author_id: Uuid) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM posts WHERE author_id = $1")
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(result.rows_affected())
    }
}
