//! HTTP refresh push: POST the change as JSON to a gateway endpoint.

use std::time::Duration;

use async_trait::async_trait;

use iplimit_core::error::{IpLimitError, Result};
use iplimit_core::protocol::ConfigChange;

use super::{GatewayNotifier, NotifyError};

pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IpLimitError::Internal(format!("http notifier client build failed: {e}")))?;
        Ok(Self { client, endpoint: endpoint.into(), timeout })
    }
}

#[async_trait]
impl GatewayNotifier for HttpNotifier {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn notify_config_changed(&self, change: &ConfigChange) -> std::result::Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(change)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout(self.timeout)
                } else {
                    NotifyError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected { status: status.as_u16() });
        }

        tracing::debug!(endpoint = %self.endpoint, seq = change.seq, "gateway refresh pushed");
        Ok(())
    }
}
