//! User use-cases: registration, login, token resolution, profile
//! management, and the admin account surface with its deletion cascade.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use domains::{
    AccessDecision, DomainError, DomainResult, Identity, ImageUpload, MediaStorage, Page,
    PageMeta, PasswordHasher, PostRecord, PostRepo, Registration, TokenCodec, User, UserPatch,
    UserRepo,
};

/// How many recent posts a public profile carries.
const RECENT_POSTS: u32 = 5;

/// Folder under the image store that profile pictures land in.
const AVATAR_FOLDER: &str = "profiles";

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepo>,
    posts: Arc<dyn PostRepo>,
    media: Arc<dyn MediaStorage>,
    passwords: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenCodec>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        posts: Arc<dyn PostRepo>,
        media: Arc<dyn MediaStorage>,
        passwords: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenCodec>,
    ) -> Self {
        UserService {
            users,
            posts,
            media,
            passwords,
            tokens,
        }
    }

    /// Creates an account and signs the first token.
    #[instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, mut registration: Registration) -> DomainResult<(User, String)> {
        registration.validate()?;
        if self
            .users
            .find_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(DomainError::validation("email", "Email already registered"));
        }
        if self
            .users
            .find_by_username(&registration.username)
            .await?
            .is_some()
        {
            return Err(DomainError::validation("username", "Username already taken"));
        }
        let hash = self.passwords.hash(&registration.password).await?;
        let user = registration.into_user(hash);
        self.users.insert(&user).await?;
        let token = self.tokens.issue(user.id)?;
        info!(user = %user.id, "account registered");
        Ok((user, token))
    }

    /// Verifies credentials and signs a token. Unknown email and wrong
    /// password are indistinguishable to the caller; a deactivated account
    /// is reported as such.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<(User, String)> {
        let email = email.trim().to_lowercase();
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::unauthorized("Invalid email or password"))?;
        if !user.is_active {
            return Err(DomainError::unauthorized("Account is deactivated"));
        }
        if !self.passwords.verify(password, &user.password_hash).await {
            return Err(DomainError::unauthorized("Invalid email or password"));
        }
        let token = self.tokens.issue(user.id)?;
        Ok((user, token))
    }

    /// Resolves a bearer token to a live identity. The account row is
    /// re-read on every call, so deactivation takes effect immediately even
    /// for tokens that are not yet expired.
    pub async fn authenticate(&self, token: &str) -> DomainResult<Identity> {
        let user_id = self.tokens.verify(token)?;
        let user = self
            .users
            .find(user_id)
            .await?
            .ok_or_else(|| DomainError::unauthorized("Invalid token"))?;
        if !user.is_active {
            return Err(DomainError::unauthorized("Account is deactivated"));
        }
        Ok(user.identity())
    }

    /// The caller's own account row.
    pub async fn current(&self, identity: &Identity) -> DomainResult<User> {
        self.users
            .find(identity.user_id)
            .await?
            .ok_or(DomainError::NotFound("User"))
    }

    /// Self-service profile update. Roles can never change here, whoever
    /// the caller is.
    pub async fn update_profile(
        &self,
        identity: &Identity,
        mut patch: UserPatch,
    ) -> DomainResult<User> {
        patch.role = None;
        patch.validate()?;
        let mut user = self.current(identity).await?;
        patch.apply(&mut user);
        self.users.update(&user).await?;
        Ok(user)
    }

    /// Stores a new profile picture and points the account at it. The
    /// previous picture is left to the image store; no deletion handle is
    /// kept for avatars.
    pub async fn set_avatar(&self, identity: &Identity, upload: ImageUpload) -> DomainResult<User> {
        upload.validate(ImageUpload::MAX_AVATAR_BYTES)?;
        let stored = self
            .media
            .upload(upload.data, AVATAR_FOLDER, &upload.content_type)
            .await?;
        let mut user = self.current(identity).await?;
        user.avatar_url = Some(stored.url);
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        Ok(user)
    }

    /// Re-hashes after verifying the current password.
    pub async fn change_password(
        &self,
        identity: &Identity,
        current: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        User::validate_password("newPassword", new_password)?;
        let mut user = self.current(identity).await?;
        if !self.passwords.verify(current, &user.password_hash).await {
            return Err(DomainError::validation(
                "currentPassword",
                "Current password is incorrect",
            ));
        }
        user.password_hash = self.passwords.hash(new_password).await?;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        info!(user = %user.id, "password changed");
        Ok(())
    }

    /// Public profile: the account row plus its recent published posts.
    pub async fn profile(
        &self,
        user_id: Uuid,
        requester: Option<&Identity>,
    ) -> DomainResult<(User, Vec<PostRecord>)> {
        let user = self.visible_user(user_id, requester).await?;
        let (recent, _) = self
            .posts
            .list_by_author(user.id, Page::new(1, RECENT_POSTS)?)
            .await?;
        Ok((user, recent))
    }

    /// Paginated published posts of one author.
    pub async fn posts_of(
        &self,
        user_id: Uuid,
        page: Page,
        requester: Option<&Identity>,
    ) -> DomainResult<(Vec<PostRecord>, PageMeta)> {
        let user = self.visible_user(user_id, requester).await?;
        let (records, total) = self.posts.list_by_author(user.id, page).await?;
        Ok((records, PageMeta::compute(page, total)))
    }

    /// Admin directory listing with optional name/email search.
    pub async fn list(
        &self,
        identity: &Identity,
        term: Option<&str>,
        page: Page,
    ) -> DomainResult<(Vec<User>, PageMeta)> {
        ensure_admin(identity)?;
        let (users, total) = self.users.search(term, page).await?;
        Ok((users, PageMeta::compute(page, total)))
    }

    /// Updates an account. Admins may update anyone including roles; a
    /// member may update only themselves, and a role field sent by a
    /// non-admin is dropped rather than rejected.
    pub async fn update_user(
        &self,
        target: Uuid,
        identity: &Identity,
        mut patch: UserPatch,
    ) -> DomainResult<User> {
        let mut user = self
            .users
            .find(target)
            .await?
            .ok_or(DomainError::NotFound("User"))?;
        let decision = AccessDecision::decide(user.id, Some(identity));
        if !decision.can_mutate() {
            return Err(DomainError::forbidden("not allowed to update this user"));
        }
        if decision != AccessDecision::Admin {
            patch.role = None;
        }
        patch.validate()?;
        patch.apply(&mut user);
        self.users.update(&user).await?;
        Ok(user)
    }

    /// Flips the active flag. Admins cannot deactivate themselves.
    pub async fn toggle_active(&self, target: Uuid, identity: &Identity) -> DomainResult<User> {
        ensure_admin(identity)?;
        if target == identity.user_id {
            return Err(DomainError::validation(
                "userId",
                "Cannot deactivate your own account",
            ));
        }
        let mut user = self
            .users
            .find(target)
            .await?
            .ok_or(DomainError::NotFound("User"))?;
        user.is_active = !user.is_active;
        user.updated_at = Utc::now();
        self.users.update(&user).await?;
        info!(user = %user.id, active = user.is_active, "account status toggled");
        Ok(user)
    }

    /// Deletes an account together with all its posts. Image handles are
    /// released best-effort before the rows go; admins cannot delete
    /// themselves.
    #[instrument(skip_all, fields(target = %target, admin = %identity.user_id))]
    pub async fn delete_user(&self, target: Uuid, identity: &Identity) -> DomainResult<()> {
        ensure_admin(identity)?;
        if target == identity.user_id {
            return Err(DomainError::validation(
                "userId",
                "Cannot delete your own account",
            ));
        }
        let user = self
            .users
            .find(target)
            .await?
            .ok_or(DomainError::NotFound("User"))?;
        let images = self.posts.images_by_author(user.id).await?;
        for image in &images {
            if let Err(err) = self.media.delete(&image.storage_key).await {
                warn!(key = %image.storage_key, error = %err, "failed to release stored image");
            }
        }
        let removed = self.posts.delete_by_author(user.id).await?;
        self.users.delete(user.id).await?;
        info!(posts = removed, images = images.len(), "user deleted with their posts");
        Ok(())
    }

    /// Inactive accounts read as absent for everyone but themselves and
    /// admins.
    async fn visible_user(
        &self,
        user_id: Uuid,
        requester: Option<&Identity>,
    ) -> DomainResult<User> {
        let user = self
            .users
            .find(user_id)
            .await?
            .ok_or(DomainError::NotFound("User"))?;
        if user.is_active || AccessDecision::decide(user.id, requester).can_view_hidden() {
            Ok(user)
        } else {
            Err(DomainError::NotFound("User"))
        }
    }
}

fn ensure_admin(identity: &Identity) -> DomainResult<()> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(DomainError::forbidden("admin access required"))
    }
}
