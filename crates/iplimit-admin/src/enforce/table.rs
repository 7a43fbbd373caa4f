use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use iplimit_core::error::{IpLimitError, Result};
use iplimit_core::model::ApiId;
use iplimit_core::protocol::ConfigChange;

use crate::engine::CommitBarrier;
use crate::notify::{GatewayNotifier, NotifyError};
use crate::store::{BindingStore, PolicyStore};

use super::snapshot::{AccessDecision, AccessSnapshot};

/// Live enforcement table: the receiving end of a refresh push.
///
/// Readers grab the current `Arc<AccessSnapshot>`; a push rebuilds a new
/// snapshot from the stores and swaps it in. With a commit barrier the
/// rebuild waits out any in-flight mutation instead of reading its
/// intermediate state.
pub struct AccessTable {
    policies: Arc<dyn PolicyStore>,
    bindings: Arc<dyn BindingStore>,
    barrier: Option<CommitBarrier>,
    current: RwLock<Arc<AccessSnapshot>>,
}

impl AccessTable {
    pub fn new(policies: Arc<dyn PolicyStore>, bindings: Arc<dyn BindingStore>) -> Self {
        Self {
            policies,
            bindings,
            barrier: None,
            current: RwLock::new(Arc::new(AccessSnapshot::default())),
        }
    }

    pub fn with_barrier(mut self, barrier: CommitBarrier) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn snapshot(&self) -> Arc<AccessSnapshot> {
        // Poisoned lock means a panic mid-swap; serve an empty table instead of panicking.
        match self.current.read() {
            Ok(g) => Arc::clone(&g),
            Err(_) => Arc::new(AccessSnapshot::default()),
        }
    }

    pub fn check(&self, api_id: &ApiId, ip: IpAddr) -> AccessDecision {
        self.snapshot().decide(api_id, ip)
    }

    /// Rebuild from the stores and install if not older than the current one.
    /// Returns whether the snapshot was installed.
    pub async fn reload(&self, seq: u64) -> Result<bool> {
        let next = {
            let _committed = match &self.barrier {
                Some(b) => Some(b.read().await),
                None => None,
            };
            AccessSnapshot::build(seq, self.policies.as_ref(), self.bindings.as_ref()).await?
        };

        let mut g = self
            .current
            .write()
            .map_err(|_| IpLimitError::Internal("access table lock poisoned".into()))?;
        if next.seq() < g.seq() {
            tracing::debug!(seq, current = g.seq(), "stale access snapshot dropped");
            return Ok(false);
        }
        tracing::debug!(seq, rules = next.len(), "access snapshot installed");
        *g = Arc::new(next);
        Ok(true)
    }
}

#[async_trait]
impl GatewayNotifier for AccessTable {
    fn name(&self) -> &'static str {
        "access_table"
    }

    async fn notify_config_changed(&self, change: &ConfigChange) -> std::result::Result<(), NotifyError> {
        self.reload(change.seq)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Snapshot(e.to_string()))
    }
}
