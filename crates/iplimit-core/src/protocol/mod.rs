//! Gateway propagation protocol.
//!
//! After every committed mutation the admin side pushes a `ConfigChange`
//! describing what moved. Receivers treat it as a refresh trigger plus a hint
//! of which APIs to recompile; the stores remain the source of truth.
//!
//! Decoding is strict and panic-free: unknown fields and unsupported versions
//! are reported as `IpLimitError` rather than silently ignored.

pub mod change;

pub use change::{decode_change, encode_change, ChangeKind, ConfigChange, PROTOCOL_VERSION};
