//! Core infrastructure for the Janus bot gate.
//!
//! This crate contains the shared infrastructure modules used by the server
//! crate: error and result types, configuration loading, client address
//! resolution, the fixed-window rate limiter, and the in-memory stores for
//! fingerprints, challenges, sessions, and injection nonces. Extracting these
//! into a separate crate keeps the server crate focused on request handling.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod extract;
pub mod prelude;
pub mod rate_limit;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, JnResult};
pub use extract::{ClientIp, OptionalTls, TlsFingerprint};
pub use rate_limit::RateLimiter;
pub use types::Timestamp;

// vim: ts=4
