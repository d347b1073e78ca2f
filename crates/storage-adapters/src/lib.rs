//! Persistence and media adapters.
//!
//! `mem` is always available and backs the test suites; `postgres` is the
//! production store behind the `db-postgres` feature. Media adapters follow
//! the same split: a local filesystem store and an S3 store, each behind
//! its feature.

pub mod media;
pub mod mem;
#[cfg(feature = "db-postgres")]
pub mod postgres;
