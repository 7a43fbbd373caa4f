//! iplimit admin library entry.
//!
//! This crate wires the stores, the policy engine, gateway propagation, the
//! local enforcement table and the admin HTTP facade into one service. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod admin;
pub mod app_state;
pub mod config;
pub mod enforce;
pub mod engine;
pub mod notify;
pub mod obs;
pub mod ops;
pub mod router;
pub mod store;
