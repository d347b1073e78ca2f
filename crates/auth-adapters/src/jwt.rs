//! HS256 bearer tokens behind the [`domains::TokenCodec`] port.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use domains::{DomainError, DomainResult, TokenCodec};

/// Tokens live thirty days; revocation before expiry happens through the
/// account's active flag, which the services re-check on every request.
const TOKEN_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    iat: i64,
    exp: i64,
}

pub struct JwtTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtTokens {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        JwtTokens {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::default(),
        }
    }
}

impl TokenCodec for JwtTokens {
    fn issue(&self, user_id: Uuid) -> DomainResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(DomainError::upstream)
    }

    fn verify(&self, token: &str) -> DomainResult<Uuid> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims.sub)
            .map_err(|err| {
                debug!(reason = %err, "rejected bearer token");
                DomainError::unauthorized("Token is not valid")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("a-very-long-signing-secret-for-tests")
    }

    #[test]
    fn issued_tokens_verify_to_the_same_user() {
        let codec = JwtTokens::new(&secret());
        let user_id = Uuid::now_v7();
        let token = codec.issue(user_id).unwrap();
        assert_eq!(codec.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let codec = JwtTokens::new(&secret());
        let mut token = codec.issue(Uuid::now_v7()).unwrap();
        token.pop();
        token.push('A');
        assert!(matches!(
            codec.verify(&token).unwrap_err(),
            DomainError::Unauthorized(_)
        ));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let codec = JwtTokens::new(&secret());
        let other = JwtTokens::new(&SecretString::from("some-other-secret-entirely"));
        let token = other.issue(Uuid::now_v7()).unwrap();
        assert!(codec.verify(&token).is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let codec = JwtTokens::new(&secret());
        let stale = Claims {
            sub: Uuid::now_v7(),
            iat: (Utc::now() - Duration::days(40)).timestamp(),
            exp: (Utc::now() - Duration::days(10)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &stale,
            &EncodingKey::from_secret(secret().expose_secret().as_bytes()),
        )
        .unwrap();
        assert!(codec.verify(&token).is_err());
    }
}
