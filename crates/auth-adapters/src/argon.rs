//! Argon2id password hashing behind the [`domains::PasswordHasher`] port.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use tracing::warn;

use domains::{DomainError, DomainResult, PasswordHasher};

/// Hashes with the argon2 crate's default parameters and stores PHC strings,
/// so parameter upgrades verify old hashes transparently.
///
/// Hashing is deliberately slow, so both operations run on the blocking
/// pool rather than a runtime worker.
#[derive(Clone, Default)]
pub struct ArgonHasher {
    argon: Argon2<'static>,
}

impl ArgonHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PasswordHasher for ArgonHasher {
    async fn hash(&self, password: &str) -> DomainResult<String> {
        let argon = self.argon.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(DomainError::upstream)
        })
        .await
        .map_err(DomainError::upstream)?
    }

    async fn verify(&self, password: &str, hash: &str) -> bool {
        let argon = self.argon.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed) => argon.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(err) => {
                warn!(reason = %err, "stored password hash did not parse");
                false
            }
        })
        .await
        .unwrap_or(false)
    }
}
