//! Admin HTTP facade (controllers).
//!
//! Handlers parse requests, call `IpLimitService`, and wrap results in the
//! uniform `ResultBody` envelope.

pub mod envelope;
pub mod facade;
pub mod handlers;

pub use envelope::{ApiError, ResultBody};
pub use facade::IpLimitService;
