//! Post use-cases: listings with their view side effect, the single-post
//! fetch, authoring, comments, and the pinned rail.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use domains::{
    AccessDecision, AuthorCard, Comment, CommentRecord, DomainError, DomainResult, Identity,
    ImageUpload, MediaStorage, NewPost, Page, PageMeta, Post, PostDetail, PostImage, PostPatch,
    PostQuery, PostRecord, PostRepo, UserRepo,
};

/// Maximum size of the pinned rail.
const PINNED_LIMIT: u32 = 5;

/// Folder under the image store that post attachments land in.
const POST_FOLDER: &str = "posts";

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepo>,
    users: Arc<dyn UserRepo>,
    media: Arc<dyn MediaStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepo>,
        users: Arc<dyn UserRepo>,
        media: Arc<dyn MediaStorage>,
    ) -> Self {
        PostService { posts, users, media }
    }

    /// Lists published posts, newest first, with the authenticated viewer
    /// absorbed into the viewer set of every post on the page.
    pub async fn list(
        &self,
        query: &PostQuery,
        page: Page,
        requester: Option<&Identity>,
    ) -> DomainResult<(Vec<PostRecord>, PageMeta)> {
        let viewer = requester.map(|identity| identity.user_id);
        let (mut records, total) = self.posts.list(query, page, viewer).await?;
        if let Some(viewer) = viewer {
            self.absorb_views(&mut records, viewer).await?;
        }
        Ok((records, PageMeta::compute(page, total)))
    }

    /// Fetches one post with comments. Authenticated callers join the
    /// viewer set; the returned count reflects the state after this call.
    pub async fn get(&self, id: Uuid, requester: Option<&Identity>) -> DomainResult<PostDetail> {
        let mut detail = self
            .posts
            .find(id)
            .await?
            .ok_or(DomainError::NotFound("Post"))?;
        ensure_visible(&detail.post, requester)?;
        if let Some(identity) = requester {
            if self.posts.register_view(id, identity.user_id).await? {
                detail.view_count += 1;
            }
        }
        Ok(detail)
    }

    /// The pinned rail: up to five pinned posts, newest first.
    pub async fn pinned(&self) -> DomainResult<Vec<PostRecord>> {
        self.posts.list_pinned(PINNED_LIMIT).await
    }

    /// Creates a post, storing attachments first. If any upload or the
    /// insert itself fails, already-stored images are released again and the
    /// whole creation is aborted.
    #[instrument(skip_all, fields(author = %identity.user_id))]
    pub async fn create(
        &self,
        identity: &Identity,
        mut input: NewPost,
        uploads: Vec<ImageUpload>,
    ) -> DomainResult<PostDetail> {
        input.validate()?;
        if uploads.len() > Post::MAX_IMAGES {
            return Err(DomainError::validation(
                "images",
                format!("cannot attach more than {} images", Post::MAX_IMAGES),
            ));
        }
        for upload in &uploads {
            upload.validate(ImageUpload::MAX_BYTES)?;
        }

        // Resolve the author before touching the image store so a stale
        // token cannot strand uploads.
        let author = self.author_card(identity.user_id).await?;
        let images = self.store_images(&uploads).await?;
        let post = input.into_post(identity.user_id, images);
        if let Err(err) = self.posts.insert(&post).await {
            self.release_images(&post.images).await;
            return Err(err);
        }
        info!(post = %post.id, images = post.images.len(), "post created");
        Ok(PostDetail {
            post,
            author,
            comments: Vec::new(),
            view_count: 0,
        })
    }

    /// Applies a partial update. Only the author or an admin may modify.
    pub async fn update(
        &self,
        id: Uuid,
        identity: &Identity,
        mut patch: PostPatch,
    ) -> DomainResult<PostDetail> {
        patch.validate()?;
        let mut post = self
            .posts
            .find_bare(id)
            .await?
            .ok_or(DomainError::NotFound("Post"))?;
        if !AccessDecision::decide(post.author_id, Some(identity)).can_mutate() {
            return Err(DomainError::forbidden("not allowed to modify this post"));
        }
        patch.apply(&mut post);
        self.posts.update(&post).await?;
        self.posts
            .find(id)
            .await?
            .ok_or(DomainError::NotFound("Post"))
    }

    /// Deletes a post and its comments and viewer set. Image handles are
    /// released first; a failed release is logged and skipped, the row
    /// delete is the authoritative step.
    #[instrument(skip_all, fields(post = %id, requester = %identity.user_id))]
    pub async fn delete(&self, id: Uuid, identity: &Identity) -> DomainResult<()> {
        let post = self
            .posts
            .find_bare(id)
            .await?
            .ok_or(DomainError::NotFound("Post"))?;
        if !AccessDecision::decide(post.author_id, Some(identity)).can_mutate() {
            return Err(DomainError::forbidden("not allowed to delete this post"));
        }
        self.release_images(&post.images).await;
        self.posts.delete(id).await?;
        info!("post deleted");
        Ok(())
    }

    /// Appends a comment and returns it hydrated with the author's card.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        identity: &Identity,
        body: &str,
    ) -> DomainResult<CommentRecord> {
        let body = Comment::validate_body(body)?;
        let post = self
            .posts
            .find_bare(post_id)
            .await?
            .ok_or(DomainError::NotFound("Post"))?;
        ensure_visible(&post, Some(identity))?;
        let comment = Comment::new(identity.user_id, body);
        self.posts.add_comment(post_id, &comment).await?;
        let author = self.author_card(identity.user_id).await?;
        Ok(CommentRecord { comment, author })
    }

    /// Removes a comment. Permitted for the comment's author or an admin;
    /// the post's author gets no special right over other people's comments.
    pub async fn remove_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        identity: &Identity,
    ) -> DomainResult<()> {
        if self.posts.find_bare(post_id).await?.is_none() {
            return Err(DomainError::NotFound("Post"));
        }
        let comment = self
            .posts
            .find_comment(post_id, comment_id)
            .await?
            .ok_or(DomainError::NotFound("Comment"))?;
        if !AccessDecision::decide(comment.author_id, Some(identity)).can_mutate() {
            return Err(DomainError::forbidden("not allowed to delete this comment"));
        }
        if !self.posts.delete_comment(post_id, comment_id).await? {
            // Raced with another delete; present the same absence.
            return Err(DomainError::NotFound("Comment"));
        }
        Ok(())
    }

    /// Flips the pinned flag. Admin only; post authors cannot pin their own
    /// work.
    pub async fn toggle_pin(&self, id: Uuid, identity: &Identity) -> DomainResult<Post> {
        let mut post = self
            .posts
            .find_bare(id)
            .await?
            .ok_or(DomainError::NotFound("Post"))?;
        if AccessDecision::decide(post.author_id, Some(identity)) != AccessDecision::Admin {
            return Err(DomainError::forbidden("only admins can pin posts"));
        }
        post.is_pinned = !post.is_pinned;
        post.updated_at = chrono::Utc::now();
        self.posts.update(&post).await?;
        info!(post = %post.id, pinned = post.is_pinned, "pin toggled");
        Ok(post)
    }

    async fn author_card(&self, user_id: Uuid) -> DomainResult<AuthorCard> {
        let user = self
            .users
            .find(user_id)
            .await?
            .ok_or(DomainError::NotFound("User"))?;
        Ok(AuthorCard::from(&user))
    }

    /// Registers the viewer against every unseen post on the page and
    /// reflects the additions in the returned counts, so the page is
    /// consistent with the state it just produced.
    async fn absorb_views(&self, records: &mut [PostRecord], viewer: Uuid) -> DomainResult<()> {
        let unseen: Vec<Uuid> = records
            .iter()
            .filter(|record| !record.viewed_by_requester)
            .map(|record| record.post.id)
            .collect();
        if unseen.is_empty() {
            return Ok(());
        }
        self.posts.register_views(&unseen, viewer).await?;
        for record in records
            .iter_mut()
            .filter(|record| !record.viewed_by_requester)
        {
            record.view_count += 1;
            record.viewed_by_requester = true;
        }
        Ok(())
    }

    async fn store_images(&self, uploads: &[ImageUpload]) -> DomainResult<Vec<PostImage>> {
        let mut images: Vec<PostImage> = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self
                .media
                .upload(upload.data.clone(), POST_FOLDER, &upload.content_type)
                .await
            {
                Ok(stored) => images.push(PostImage {
                    url: stored.url,
                    storage_key: stored.storage_key,
                    caption: String::new(),
                }),
                Err(err) => {
                    self.release_images(&images).await;
                    return Err(err);
                }
            }
        }
        Ok(images)
    }

    async fn release_images(&self, images: &[PostImage]) {
        for image in images {
            if let Err(err) = self.media.delete(&image.storage_key).await {
                warn!(key = %image.storage_key, error = %err, "failed to release stored image");
            }
        }
    }
}

/// Unpublished posts read as absent for everyone but the owner and admins.
fn ensure_visible(post: &Post, requester: Option<&Identity>) -> DomainResult<()> {
    if post.is_published || AccessDecision::decide(post.author_id, requester).can_view_hidden() {
        Ok(())
    } else {
        Err(DomainError::NotFound("Post"))
    }
}
