//! Shared application state for the iplimit admin service.
//!
//! Wires the store, the access table, the configured gateway notifiers and
//! the policy engine. Startup errors surface as `Result` instead of panics.

use std::sync::Arc;
use std::time::Duration;

use iplimit_core::error::Result;

use crate::admin::IpLimitService;
use crate::config::{NotifierMode, ServiceConfig};
use crate::enforce::AccessTable;
use crate::engine::{CommitBarrier, EngineOptions, PolicyEngine};
use crate::notify::{FanoutNotifier, GatewayNotifier, HttpNotifier, LogNotifier};
use crate::obs::AdminMetrics;
use crate::store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    store: Arc<MemoryStore>,
    service: IpLimitService,
    access: Arc<AccessTable>,
    metrics: Arc<AdminMetrics>,
}

impl AppState {
    /// Build state with the notifiers named in `cfg.notifier`.
    pub fn new(cfg: ServiceConfig) -> Result<Self> {
        let external = external_notifiers(&cfg)?;
        Ok(Self::with_notifiers(cfg, external))
    }

    /// Build state with explicit external notifiers. The local access table
    /// is always refreshed in addition to these.
    pub fn with_notifiers(cfg: ServiceConfig, external: Vec<Arc<dyn GatewayNotifier>>) -> Self {
        let store = Arc::new(MemoryStore::new().with_apis(cfg.catalog.apis.iter().cloned()));
        let metrics = Arc::new(AdminMetrics::default());
        let barrier = CommitBarrier::default();
        let access = Arc::new(AccessTable::new(store.clone(), store.clone()).with_barrier(barrier.clone()));

        let mut targets: Vec<Arc<dyn GatewayNotifier>> = vec![access.clone()];
        targets.extend(external);
        tracing::info!(
            targets = ?targets.iter().map(|t| t.name()).collect::<Vec<_>>(),
            "gateway notifiers configured"
        );

        let engine = PolicyEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(FanoutNotifier::new(targets)),
        )
        .with_options(EngineOptions {
            notify_timeout: Duration::from_millis(cfg.notifier.timeout_ms),
            kind_change: cfg.policy.kind_change,
        })
        .with_metrics(metrics.clone())
        .with_barrier(barrier);

        let service = IpLimitService::new(Arc::new(engine), &cfg.paging, metrics.clone());

        Self {
            inner: Arc::new(AppStateInner { cfg, store, service, access, metrics }),
        }
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn service(&self) -> &IpLimitService {
        &self.inner.service
    }

    pub fn access_table(&self) -> Arc<AccessTable> {
        Arc::clone(&self.inner.access)
    }

    pub fn metrics(&self) -> Arc<AdminMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Gauges rendered next to the registry metrics.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("iplimit_bindings", self.inner.store.binding_count() as u64),
            ("iplimit_access_rules", self.inner.access.snapshot().len() as u64),
            ("iplimit_change_seq", self.inner.service.engine().last_seq()),
        ]
    }
}

fn external_notifiers(cfg: &ServiceConfig) -> Result<Vec<Arc<dyn GatewayNotifier>>> {
    let timeout = Duration::from_millis(cfg.notifier.timeout_ms);
    match cfg.notifier.mode {
        NotifierMode::None => Ok(Vec::new()),
        NotifierMode::Log => Ok(vec![Arc::new(LogNotifier)]),
        NotifierMode::Http => cfg
            .notifier
            .endpoints
            .iter()
            .map(|ep| Ok(Arc::new(HttpNotifier::new(ep.clone(), timeout)?) as Arc<dyn GatewayNotifier>))
            .collect(),
    }
}
