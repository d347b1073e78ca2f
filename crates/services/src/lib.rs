//! Use-case layer for the club backend.
//!
//! Services own every decision the HTTP layer must not make: authorization
//! through [`domains::AccessDecision`], view registration, validation, and the
//! compensating cleanup around media uploads. They speak only through the
//! ports defined in [`domains::ports`], so the same code runs against
//! Postgres in production and the in-memory repos in tests.

mod posts;
mod users;

pub use posts::PostService;
pub use users::UserService;
