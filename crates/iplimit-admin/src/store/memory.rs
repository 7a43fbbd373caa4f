use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use iplimit_core::error::Result;
use iplimit_core::model::{ApiId, ApiSummary, Binding, Policy, PolicyFields, PolicyId};

use super::{ApiCatalog, BindingStore, PolicyFilter, PolicyStore};

/// In-memory store for all three tables:
/// - `policy_id -> Policy`
/// - `api_id -> policy_id` (the key enforces one policy per API)
/// - `api_id -> ApiSummary`
pub struct MemoryStore {
    policies: DashMap<PolicyId, Policy>,
    bindings: DashMap<ApiId, PolicyId>,
    apis: DashMap<ApiId, ApiSummary>,
    seq: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            policies: DashMap::new(),
            bindings: DashMap::new(),
            apis: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Seed catalog metadata (from config).
    pub fn with_apis(self, apis: impl IntoIterator<Item = ApiSummary>) -> Self {
        for api in apis {
            self.apis.insert(api.api_id.clone(), api);
        }
        self
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn insert(&self, fields: PolicyFields) -> Result<Policy> {
        let id = PolicyId(self.seq.fetch_add(1, Ordering::Relaxed));
        let policy = Policy::from_fields(id, fields);
        self.policies.insert(id, policy.clone());
        Ok(policy)
    }

    async fn get(&self, id: PolicyId) -> Result<Option<Policy>> {
        Ok(self.policies.get(&id).map(|r| r.value().clone()))
    }

    async fn update(&self, policy: Policy) -> Result<bool> {
        match self.policies.get_mut(&policy.id) {
            Some(mut slot) => {
                *slot = policy;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: PolicyId) -> Result<bool> {
        Ok(self.policies.remove(&id).is_some())
    }

    async fn list(&self, filter: &PolicyFilter) -> Result<Vec<Policy>> {
        let mut out: Vec<Policy> = self
            .policies
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|p| p.id);
        Ok(out)
    }
}

#[async_trait]
impl BindingStore for MemoryStore {
    async fn upsert_by_api(&self, api_id: ApiId, policy_id: PolicyId) -> Result<Option<PolicyId>> {
        Ok(self.bindings.insert(api_id, policy_id))
    }

    async fn get_by_api(&self, api_id: &ApiId) -> Result<Option<Binding>> {
        Ok(self.bindings.get(api_id).map(|r| Binding {
            api_id: r.key().clone(),
            policy_id: *r.value(),
        }))
    }

    async fn delete_by_api(&self, api_id: &ApiId) -> Result<Option<Binding>> {
        Ok(self
            .bindings
            .remove(api_id)
            .map(|(api_id, policy_id)| Binding { api_id, policy_id }))
    }

    async fn delete_by_policy(&self, policy_id: PolicyId) -> Result<Vec<ApiId>> {
        let mut released = Vec::new();
        self.bindings.retain(|api, owner| {
            if *owner == policy_id {
                released.push(api.clone());
                false
            } else {
                true
            }
        });
        released.sort();
        Ok(released)
    }

    async fn count_by_policy(&self, policy_id: PolicyId) -> Result<usize> {
        Ok(self.bindings.iter().filter(|r| *r.value() == policy_id).count())
    }

    async fn all_by_policy(&self, policy_id: PolicyId) -> Result<Vec<Binding>> {
        let mut out: Vec<Binding> = self
            .bindings
            .iter()
            .filter(|r| *r.value() == policy_id)
            .map(|r| Binding { api_id: r.key().clone(), policy_id })
            .collect();
        out.sort_by(|a, b| a.api_id.cmp(&b.api_id));
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<Binding>> {
        let mut out: Vec<Binding> = self
            .bindings
            .iter()
            .map(|r| Binding { api_id: r.key().clone(), policy_id: *r.value() })
            .collect();
        out.sort_by(|a, b| a.api_id.cmp(&b.api_id));
        Ok(out)
    }
}

#[async_trait]
impl ApiCatalog for MemoryStore {
    async fn get(&self, api_id: &ApiId) -> Result<Option<ApiSummary>> {
        Ok(self.apis.get(api_id).map(|r| r.value().clone()))
    }
}
