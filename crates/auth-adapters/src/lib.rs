//! Credential adapters: Argon2 password hashing and, behind the `auth-jwt`
//! feature, the bearer-token codec.

mod argon;
#[cfg(feature = "auth-jwt")]
mod jwt;

pub use argon::ArgonHasher;
#[cfg(feature = "auth-jwt")]
pub use jwt::JwtTokens;
