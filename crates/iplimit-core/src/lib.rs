//! iplimit core: policy model, IP range parsing, paging, and the gateway
//! change-notification wire format.
//!
//! This crate defines the data contracts shared by the admin service, the
//! gateway-side enforcement table and SDK tooling. It carries no transport,
//! storage or runtime dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `IpLimitError`/`Result` so a malformed
//! policy submission can never take the admin service down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod protocol;

/// Shared result type.
pub use error::{IpLimitError, Result};
