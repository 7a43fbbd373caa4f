use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, RwLockWriteGuard};

use iplimit_core::error::{IpLimitError, Result};
use iplimit_core::model::{
    ApiId, Binding, BoundApi, PageList, PageParams, Policy, PolicyDraft, PolicyId, PolicyKind,
    PolicyWithApis,
};
use iplimit_core::protocol::{ChangeKind, ConfigChange};

use crate::config::KindChangeMode;
use crate::notify::{GatewayNotifier, NotifyError};
use crate::obs::AdminMetrics;
use crate::store::{ApiCatalog, BindingStore, PolicyFilter, PolicyStore};

use super::{CommitBarrier, Committed, PropagationWarning};

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Upper bound on one notifier call; the mutation is already committed.
    pub notify_timeout: Duration,
    pub kind_change: KindChangeMode,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            notify_timeout: Duration::from_millis(3000),
            kind_change: KindChangeMode::Reject,
        }
    }
}

/// Binding/consistency engine.
/// Construct once at startup, then share via Arc.
pub struct PolicyEngine {
    policies: Arc<dyn PolicyStore>,
    bindings: Arc<dyn BindingStore>,
    catalog: Arc<dyn ApiCatalog>,
    notifier: Arc<dyn GatewayNotifier>,
    options: EngineOptions,
    metrics: Option<Arc<AdminMetrics>>,

    // Unit of work: mutations never interleave their guard checks and writes.
    write_lock: CommitBarrier,
    seq: AtomicU64,
}

impl PolicyEngine {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        bindings: Arc<dyn BindingStore>,
        catalog: Arc<dyn ApiCatalog>,
        notifier: Arc<dyn GatewayNotifier>,
    ) -> Self {
        Self {
            policies,
            bindings,
            catalog,
            notifier,
            options: EngineOptions::default(),
            metrics: None,
            write_lock: Arc::new(RwLock::new(())),
            seq: AtomicU64::new(0),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<AdminMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Share the write lock with readers that must see whole batches only.
    pub fn with_barrier(mut self, barrier: CommitBarrier) -> Self {
        self.write_lock = barrier;
        self
    }

    /// Sequence number of the last committed change.
    pub fn last_seq(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    // --------------------
    // Reads
    // --------------------

    pub async fn list_policies_page(
        &self,
        page: PageParams,
        keyword: Option<&str>,
    ) -> Result<PageList<Policy>> {
        let all = self.policies.list(&PolicyFilter::keyword(keyword)).await?;
        Ok(PageList::paginate(all, page))
    }

    /// Policies of one kind joined with their bound APIs.
    pub async fn list_by_kind(
        &self,
        kind: PolicyKind,
        page: PageParams,
    ) -> Result<PageList<PolicyWithApis>> {
        let all = self.policies.list(&PolicyFilter::kind(kind)).await?;
        let page = PageList::paginate(all, page);

        let mut records = Vec::with_capacity(page.records.len());
        for policy in &page.records {
            let bindings = self.bindings.all_by_policy(policy.id).await?;
            records.push(PolicyWithApis {
                policy: policy.clone(),
                apis: self.decorate(bindings).await?,
            });
        }

        Ok(PageList { page: page.page, limit: page.limit, total: page.total, records })
    }

    pub async fn get_policy(&self, id: PolicyId) -> Result<Policy> {
        self.policies
            .get(id)
            .await?
            .ok_or_else(|| policy_not_found(id))
    }

    pub async fn list_apis_for_policy(
        &self,
        policy_id: PolicyId,
        page: PageParams,
    ) -> Result<PageList<BoundApi>> {
        self.get_policy(policy_id).await?;
        let page = self.bindings.list_by_policy(policy_id, page).await?;
        let records = self.decorate(page.records).await?;
        Ok(PageList { page: page.page, limit: page.limit, total: page.total, records })
    }

    pub async fn binding_for(&self, api_id: &ApiId) -> Result<Option<Binding>> {
        self.bindings.get_by_api(api_id).await
    }

    // --------------------
    // Policy mutations
    // --------------------

    pub async fn add_policy(&self, draft: PolicyDraft) -> Result<Committed<PolicyId>> {
        let fields = draft.validate()?;

        let (id, pending) = {
            let _guard = self.lock().await;
            let policy = self.policies.insert(fields).await?;
            tracing::info!(
                policy_id = %policy.id,
                kind = policy.kind.as_str(),
                ranges = policy.ip_ranges.len(),
                "policy added"
            );
            (policy.id, self.pending(ChangeKind::PolicyAdded, Some(policy.id)))
        };

        Ok(self.propagate(id, pending).await)
    }

    /// Replace a policy's content. Bindings are left untouched.
    pub async fn update_policy(&self, id: PolicyId, draft: PolicyDraft) -> Result<Committed<()>> {
        let fields = draft.validate()?;

        let pending = {
            let _guard = self.lock().await;
            let existing = self.get_policy(id).await?;
            let bound = self.bindings.all_by_policy(id).await?;

            if existing.kind != fields.kind {
                match self.options.kind_change {
                    KindChangeMode::Reject => {
                        return Err(IpLimitError::Validation(format!(
                            "policy {id} kind is immutable ({} -> {})",
                            existing.kind.as_str(),
                            fields.kind.as_str()
                        )));
                    }
                    KindChangeMode::Warn => {
                        tracing::warn!(
                            policy_id = %id,
                            from = existing.kind.as_str(),
                            to = fields.kind.as_str(),
                            bound_apis = bound.len(),
                            "policy kind changed; enforcement flips for every bound api"
                        );
                    }
                }
            }

            if !self.policies.update(Policy::from_fields(id, fields)).await? {
                return Err(policy_not_found(id));
            }
            tracing::info!(policy_id = %id, "policy updated");

            let apis = bound.into_iter().map(|b| b.api_id).collect();
            self.pending(ChangeKind::PolicyUpdated, Some(id)).with_apis(apis)
        };

        Ok(self.propagate((), pending).await)
    }

    /// Delete a policy with no bindings. Bindings are never cascaded.
    pub async fn remove_policy(&self, id: PolicyId) -> Result<Committed<()>> {
        let pending = {
            let _guard = self.lock().await;
            self.get_policy(id).await?;

            let bound = self.bindings.count_by_policy(id).await?;
            if bound > 0 {
                return Err(IpLimitError::Conflict(format!(
                    "policy {id} is still bound to {bound} api(s); clear them first"
                )));
            }

            if !self.policies.delete(id).await? {
                return Err(policy_not_found(id));
            }
            tracing::info!(policy_id = %id, "policy removed");
            self.pending(ChangeKind::PolicyRemoved, Some(id))
        };

        Ok(self.propagate((), pending).await)
    }

    // --------------------
    // Binding mutations
    // --------------------

    /// Bind every api to `policy_id`, taking it from whatever policy held it.
    /// One notification for the whole batch.
    pub async fn bind(&self, policy_id: PolicyId, api_ids: Vec<ApiId>) -> Result<Committed<()>> {
        if api_ids.is_empty() {
            return Err(IpLimitError::Validation("apiIds must not be empty".into()));
        }
        reject_blank(&api_ids)?;

        let pending = {
            let _guard = self.lock().await;
            self.get_policy(policy_id).await?;

            let (affected, released) = self.upsert_all(policy_id, api_ids).await?;
            tracing::info!(policy_id = %policy_id, apis = affected.len(), released_from = ?released, "apis bound");

            self.pending(ChangeKind::ApisBound, Some(policy_id))
                .with_apis(affected)
                .with_released(released)
        };

        Ok(self.propagate((), pending).await)
    }

    /// Make `api_ids` the exact set bound to `policy_id`. An unchanged set is a no-op.
    pub async fn replace_apis(&self, policy_id: PolicyId, api_ids: Vec<ApiId>) -> Result<Committed<()>> {
        reject_blank(&api_ids)?;

        let pending = {
            let _guard = self.lock().await;
            self.get_policy(policy_id).await?;

            let current: HashSet<ApiId> = self
                .bindings
                .all_by_policy(policy_id)
                .await?
                .into_iter()
                .map(|b| b.api_id)
                .collect();
            let requested: HashSet<&ApiId> = api_ids.iter().collect();
            if requested.len() == current.len() && requested.iter().all(|a| current.contains(*a)) {
                tracing::debug!(policy_id = %policy_id, apis = current.len(), "replace apis: bound set unchanged");
                return Ok(Committed::quiet(()));
            }

            let cleared = self.bindings.delete_by_policy(policy_id).await?;
            let (bound, released) = self.upsert_all(policy_id, api_ids).await?;
            tracing::info!(policy_id = %policy_id, cleared = cleared.len(), bound = bound.len(), "apis replaced");

            let mut seen: HashSet<ApiId> = HashSet::new();
            let affected: Vec<ApiId> = cleared
                .into_iter()
                .chain(bound)
                .filter(|a| seen.insert(a.clone()))
                .collect();

            self.pending(ChangeKind::ApisReplaced, Some(policy_id))
                .with_apis(affected)
                .with_released(released)
        };

        Ok(self.propagate((), pending).await)
    }

    /// Remove every binding of the policy. Returns how many were removed.
    pub async fn clear_by_policy(&self, policy_id: PolicyId) -> Result<Committed<usize>> {
        let (count, pending) = {
            let _guard = self.lock().await;
            self.get_policy(policy_id).await?;

            let released = self.bindings.delete_by_policy(policy_id).await?;
            if released.is_empty() {
                return Ok(Committed::quiet(0));
            }
            tracing::info!(policy_id = %policy_id, apis = released.len(), "policy bindings cleared");

            let count = released.len();
            (count, self.pending(ChangeKind::ApisClearedByPolicy, Some(policy_id)).with_apis(released))
        };

        Ok(self.propagate(count, pending).await)
    }

    /// Unbind one api. Absent binding is a no-op. Returns whether one was removed.
    pub async fn clear_by_api(&self, api_id: &ApiId) -> Result<Committed<bool>> {
        let pending = {
            let _guard = self.lock().await;

            let Some(removed) = self.bindings.delete_by_api(api_id).await? else {
                tracing::debug!(api_id = %api_id, "clear by api: nothing bound");
                return Ok(Committed::quiet(false));
            };
            tracing::info!(api_id = %api_id, policy_id = %removed.policy_id, "api binding cleared");

            self.pending(ChangeKind::ApiCleared, None)
                .with_apis(vec![removed.api_id])
                .with_released(vec![removed.policy_id])
        };

        Ok(self.propagate(true, pending).await)
    }

    // --------------------
    // Internals
    // --------------------

    async fn lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.write_lock.write().await
    }

    /// Upsert each api; returns (affected apis in first-seen order, previous owners).
    async fn upsert_all(
        &self,
        policy_id: PolicyId,
        api_ids: Vec<ApiId>,
    ) -> Result<(Vec<ApiId>, Vec<PolicyId>)> {
        let mut seen: HashSet<ApiId> = HashSet::with_capacity(api_ids.len());
        let mut affected = Vec::with_capacity(api_ids.len());
        let mut released = BTreeSet::new();

        for api in api_ids {
            if let Some(prev) = self.bindings.upsert_by_api(api.clone(), policy_id).await? {
                if prev != policy_id {
                    released.insert(prev);
                }
            }
            if seen.insert(api.clone()) {
                affected.push(api);
            }
        }

        Ok((affected, released.into_iter().collect()))
    }

    async fn decorate(&self, bindings: Vec<Binding>) -> Result<Vec<BoundApi>> {
        let mut out = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let api = self.catalog.get(&binding.api_id).await?;
            out.push(BoundApi { binding, api });
        }
        Ok(out)
    }

    /// Must be called while holding the write lock so seq follows commit order.
    fn pending(&self, kind: ChangeKind, policy_id: Option<PolicyId>) -> ConfigChange {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        ConfigChange::new(seq, kind, policy_id)
    }

    /// Push a committed change. Never fails the operation.
    async fn propagate<T>(&self, value: T, change: ConfigChange) -> Committed<T> {
        let started = Instant::now();

        let res = match tokio::time::timeout(
            self.options.notify_timeout,
            self.notifier.notify_config_changed(&change),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(NotifyError::Timeout(self.options.notify_timeout)),
        };

        let outcome = match &res {
            Ok(()) => "ok",
            Err(NotifyError::Timeout(_)) => "timeout",
            Err(_) => "failed",
        };
        if let Some(m) = &self.metrics {
            m.notifications.inc(&[("notifier", self.notifier.name()), ("outcome", outcome)]);
            m.notify_duration.observe(&[("notifier", self.notifier.name())], started.elapsed());
        }

        match res {
            Ok(()) => {
                tracing::debug!(seq = change.seq, kind = change.kind.as_str(), "change propagated");
                Committed::quiet(value)
            }
            Err(e) => {
                tracing::warn!(
                    seq = change.seq,
                    kind = change.kind.as_str(),
                    policy_id = ?change.policy_id,
                    error = %e,
                    "gateway propagation failed; change is committed"
                );
                Committed {
                    value,
                    warning: Some(PropagationWarning {
                        seq: change.seq,
                        change: change.kind,
                        policy_id: change.policy_id,
                        message: e.to_string(),
                    }),
                }
            }
        }
    }
}

fn reject_blank(api_ids: &[ApiId]) -> Result<()> {
    if api_ids.iter().any(|a| a.as_str().trim().is_empty()) {
        return Err(IpLimitError::Validation("apiIds must not contain blank ids".into()));
    }
    Ok(())
}

fn policy_not_found(id: PolicyId) -> IpLimitError {
    IpLimitError::NotFound(format!("ip limit policy {id}"))
}
