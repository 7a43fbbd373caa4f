//! Shared fixtures: engine wiring over `MemoryStore` and notifier fakes.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use iplimit_admin::engine::{EngineOptions, PolicyEngine};
use iplimit_admin::notify::{GatewayNotifier, NotifyError};
use iplimit_admin::store::MemoryStore;
use iplimit_core::model::{ApiId, ApiSummary, PolicyDraft, PolicyKind};
use iplimit_core::protocol::ConfigChange;

/// Records every change it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<ConfigChange>>,
}

impl RecordingNotifier {
    pub fn changes(&self) -> Vec<ConfigChange> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl GatewayNotifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify_config_changed(&self, change: &ConfigChange) -> Result<(), NotifyError> {
        self.seen.lock().unwrap().push(change.clone());
        Ok(())
    }
}

/// Always refuses, like a gateway that is down.
pub struct FailingNotifier;

#[async_trait]
impl GatewayNotifier for FailingNotifier {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn notify_config_changed(&self, _change: &ConfigChange) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".into()))
    }
}

/// Never answers within any reasonable timeout.
pub struct StalledNotifier;

#[async_trait]
impl GatewayNotifier for StalledNotifier {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn notify_config_changed(&self, _change: &ConfigChange) -> Result<(), NotifyError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

pub fn catalog() -> Vec<ApiSummary> {
    vec![
        ApiSummary {
            api_id: ApiId::from("api-1"),
            api_name: "list orders".into(),
            path: "/orders".into(),
            service_id: "order-service".into(),
        },
        ApiSummary {
            api_id: ApiId::from("api-2"),
            api_name: "create order".into(),
            path: "/orders/create".into(),
            service_id: "order-service".into(),
        },
    ]
}

pub fn engine_with(
    notifier: Arc<dyn GatewayNotifier>,
    options: EngineOptions,
) -> (Arc<MemoryStore>, PolicyEngine) {
    let store = Arc::new(MemoryStore::new().with_apis(catalog()));
    let engine = PolicyEngine::new(store.clone(), store.clone(), store.clone(), notifier)
        .with_options(options);
    (store, engine)
}

pub fn recording_engine() -> (Arc<MemoryStore>, Arc<RecordingNotifier>, PolicyEngine) {
    let rec = Arc::new(RecordingNotifier::default());
    let (store, engine) = engine_with(rec.clone(), EngineOptions::default());
    (store, rec, engine)
}

pub fn whitelist(name: &str, ranges: Vec<&str>) -> PolicyDraft {
    PolicyDraft::new(name, PolicyKind::Whitelist, ranges)
}

pub fn blacklist(name: &str, ranges: Vec<&str>) -> PolicyDraft {
    PolicyDraft::new(name, PolicyKind::Blacklist, ranges)
}

pub fn apis(ids: &[&str]) -> Vec<ApiId> {
    ids.iter().map(|s| ApiId::from(*s)).collect()
}
