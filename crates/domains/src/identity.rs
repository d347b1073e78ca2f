//! Request identity and the single authorization decision.
//!
//! Every mutation check in the services goes through
//! [`AccessDecision::decide`]; authorization is never re-derived per
//! handler.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    /// Parses the stored representation. Unknown values fall back to
    /// `Member` so a bad row can never grant admin.
    pub fn from_db(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::Member,
        }
    }
}

/// The authenticated actor making a request: user id plus role.
///
/// Anonymous callers are represented as `Option<Identity>::None`
/// throughout the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The three effective states of a caller relative to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The resource's author or subject identity.
    Owner,
    /// Any caller with the admin role.
    Admin,
    /// Everyone else, including anonymous callers.
    Other,
}

impl AccessDecision {
    /// Classifies `requester` against the resource owned by `owner`.
    ///
    /// Admin wins over Owner when both apply; the capability sets are
    /// identical so the distinction never changes an outcome.
    pub fn decide(owner: Uuid, requester: Option<&Identity>) -> Self {
        match requester {
            Some(id) if id.is_admin() => AccessDecision::Admin,
            Some(id) if id.user_id == owner => AccessDecision::Owner,
            _ => AccessDecision::Other,
        }
    }

    /// Update and delete are permitted only for Owner or Admin.
    pub fn can_mutate(self) -> bool {
        matches!(self, AccessDecision::Owner | AccessDecision::Admin)
    }

    /// Unpublished or deactivated resources read as absent for `Other`;
    /// Owner and Admin may still see them.
    pub fn can_view_hidden(self) -> bool {
        self.can_mutate()
    }
}
