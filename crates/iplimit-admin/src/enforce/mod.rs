//! Gateway-side enforcement.
//!
//! Compiles bindings of enabled policies into an api -> rule snapshot and
//! answers whether a client IP may call an API. `AccessTable` is itself a
//! `GatewayNotifier`, so the admin service keeps an in-process copy of what
//! the live gateway enforces.

pub mod snapshot;
pub mod table;

pub use snapshot::{AccessDecision, AccessRule, AccessSnapshot};
pub use table::AccessTable;
