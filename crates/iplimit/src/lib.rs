//! Top-level facade crate for iplimit.
//!
//! Re-exports the core model and the admin service library so users can
//! depend on a single crate.

pub mod core {
    pub use iplimit_core::*;
}

pub mod admin {
    pub use iplimit_admin::*;
}
