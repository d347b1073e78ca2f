//! User entity plus the validated inputs that mutate it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::identity::{Identity, Role};

/// A registered club member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized into responses.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    /// Opaque URL at the image host. The original system never kept a
    /// deletion handle for avatars, so neither do we.
    pub avatar_url: Option<String>,
    /// Self-reported Elo rating.
    pub rating: Option<i32>,
    pub role: Role,
    /// Soft-disable flag; deactivated accounts cannot log in or resolve
    /// bearer tokens.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub const USERNAME_MIN: usize = 3;
    pub const USERNAME_MAX: usize = 30;
    pub const PASSWORD_MIN: usize = 6;
    pub const PASSWORD_MAX: usize = 128;
    pub const NAME_MAX: usize = 50;
    pub const BIO_MAX: usize = 500;
    pub const RATING_MAX: i32 = 3500;

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            role: self.role,
        }
    }

    /// Bounds check shared by registration and password change.
    pub fn validate_password(field: &'static str, password: &str) -> DomainResult<()> {
        bounded(field, password, Self::PASSWORD_MIN, Self::PASSWORD_MAX)
    }
}

/// Input for account creation.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    /// Trims the textual fields, then checks every constraint.
    pub fn validate(&mut self) -> DomainResult<()> {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();

        bounded("username", &self.username, User::USERNAME_MIN, User::USERNAME_MAX)?;
        if !self.username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DomainError::validation(
                "username",
                "may only contain letters, digits and underscores",
            ));
        }
        email_shape(&self.email)?;
        User::validate_password("password", &self.password)?;
        bounded("firstName", &self.first_name, 1, User::NAME_MAX)?;
        bounded("lastName", &self.last_name, 1, User::NAME_MAX)?;
        Ok(())
    }

    /// Builds the persisted entity with member defaults.
    pub fn into_user(self, password_hash: String) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            username: self.username,
            email: self.email,
            password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: String::new(),
            avatar_url: None,
            rating: None,
            role: Role::Member,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update. `None` leaves a field untouched; provided empty
/// strings are normalized to `None` during validation, mirroring the
/// original API's skip-if-blank behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub rating: Option<i32>,
    /// Only applied for admin requesters; silently dropped otherwise.
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn validate(&mut self) -> DomainResult<()> {
        normalize(&mut self.first_name);
        normalize(&mut self.last_name);
        normalize(&mut self.avatar_url);
        if let Some(bio) = &mut self.bio {
            *bio = bio.trim().to_string();
        }

        if let Some(first) = &self.first_name {
            bounded("firstName", first, 1, User::NAME_MAX)?;
        }
        if let Some(last) = &self.last_name {
            bounded("lastName", last, 1, User::NAME_MAX)?;
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > User::BIO_MAX {
                return Err(DomainError::validation(
                    "bio",
                    format!("cannot exceed {} characters", User::BIO_MAX),
                ));
            }
        }
        if let Some(rating) = self.rating {
            if !(0..=User::RATING_MAX).contains(&rating) {
                return Err(DomainError::validation(
                    "chessRating",
                    format!("must be between 0 and {}", User::RATING_MAX),
                ));
            }
        }
        Ok(())
    }

    /// Applies every carried field onto `user`. Role gating happens in the
    /// service before this is called.
    pub fn apply(&self, user: &mut User) {
        if let Some(first) = &self.first_name {
            user.first_name = first.clone();
        }
        if let Some(last) = &self.last_name {
            user.last_name = last.clone();
        }
        if let Some(bio) = &self.bio {
            user.bio = bio.clone();
        }
        if let Some(url) = &self.avatar_url {
            user.avatar_url = Some(url.clone());
        }
        if let Some(rating) = self.rating {
            user.rating = Some(rating);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
    }
}

fn normalize(field: &mut Option<String>) {
    if let Some(value) = field {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            *field = None;
        } else if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
}

fn bounded(field: &'static str, value: &str, min: usize, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(DomainError::validation(
            field,
            format!("must be at least {min} characters"),
        ));
    }
    if len > max {
        return Err(DomainError::validation(
            field,
            format!("cannot exceed {max} characters"),
        ));
    }
    Ok(())
}

fn email_shape(email: &str) -> DomainResult<()> {
    let well_formed = email.len() <= 254
        && !email.contains(char::is_whitespace)
        && email.split_once('@').is_some_and(|(local, host)| {
            !local.is_empty() && host.contains('.') && !host.starts_with('.') && !host.ends_with('.')
        });
    if well_formed {
        Ok(())
    } else {
        Err(DomainError::validation("email", "must be a valid email address"))
    }
}
