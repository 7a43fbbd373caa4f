use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;

use iplimit_core::protocol::ConfigChange;

use super::{GatewayNotifier, NotifyError};

/// Pushes one change to every target concurrently.
/// Succeeds only if all targets succeed; failures are reported together.
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn GatewayNotifier>>,
}

impl FanoutNotifier {
    pub fn new(targets: Vec<Arc<dyn GatewayNotifier>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl GatewayNotifier for FanoutNotifier {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn notify_config_changed(&self, change: &ConfigChange) -> Result<(), NotifyError> {
        let mut futs = FuturesUnordered::new();
        for t in &self.targets {
            futs.push(async move { (t.name(), t.notify_config_changed(change).await) });
        }

        let mut failures = Vec::new();
        while let Some((name, res)) = futs.next().await {
            if let Err(e) = res {
                tracing::warn!(target_name = name, seq = change.seq, error = %e, "notify target failed");
                failures.push(format!("{name}: {e}"));
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        failures.sort();
        Err(NotifyError::Fanout {
            failed: failures.len(),
            total: self.targets.len(),
            details: failures.join("; "),
        })
    }
}
