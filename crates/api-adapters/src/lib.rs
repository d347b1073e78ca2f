//! Inbound adapters.
//!
//! `web` is the HTTP translation layer over [`services`]. It owns wire
//! shapes, status mapping, auth extraction, and request telemetry, and
//! contains no domain rules of its own.

#[cfg(feature = "web-axum")]
pub mod web;
