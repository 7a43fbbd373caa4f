//! Gateway propagation.
//!
//! `GatewayNotifier` is the injected capability the engine calls after a
//! committed mutation. Implementations push the `ConfigChange` wherever the
//! live routing layer listens: an HTTP refresh endpoint, the in-process
//! access table, several of them at once, or nowhere.

pub mod fanout;
pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use iplimit_core::protocol::ConfigChange;

pub use fanout::FanoutNotifier;
pub use http::HttpNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("gateway notification timed out after {0:?}")]
    Timeout(Duration),
    #[error("gateway transport error: {0}")]
    Transport(String),
    #[error("gateway rejected refresh with status {status}")]
    Rejected { status: u16 },
    #[error("snapshot rebuild failed: {0}")]
    Snapshot(String),
    #[error("{failed} of {total} notify targets failed: {details}")]
    Fanout { failed: usize, total: usize, details: String },
}

#[async_trait]
pub trait GatewayNotifier: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;
    async fn notify_config_changed(&self, change: &ConfigChange) -> Result<(), NotifyError>;
}

/// Drops every change.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl GatewayNotifier for NoopNotifier {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn notify_config_changed(&self, _change: &ConfigChange) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Emits each change as a structured log event.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl GatewayNotifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify_config_changed(&self, change: &ConfigChange) -> Result<(), NotifyError> {
        tracing::info!(
            seq = change.seq,
            kind = change.kind.as_str(),
            policy_id = ?change.policy_id,
            apis = change.api_ids.len(),
            released_from = ?change.released_from,
            "ip limit config changed"
        );
        Ok(())
    }
}
