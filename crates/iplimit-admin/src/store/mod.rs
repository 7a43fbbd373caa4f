//! Persistence contracts consumed by the policy engine.
//!
//! The engine only needs key lookups, key-scoped deletes and filtered scans,
//! so any storage engine can sit behind these traits. `memory` provides the
//! in-process implementation used by the service binary and tests.

pub mod memory;

use async_trait::async_trait;

use iplimit_core::error::Result;
use iplimit_core::model::{
    ApiId, ApiSummary, Binding, PageList, PageParams, Policy, PolicyFields, PolicyId, PolicyKind,
};

pub use memory::MemoryStore;

/// Scan filter for `PolicyStore::list`.
#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    /// Case-insensitive substring on name/description.
    pub keyword: Option<String>,
    pub kind: Option<PolicyKind>,
}

impl PolicyFilter {
    pub fn keyword(keyword: Option<&str>) -> Self {
        Self {
            keyword: keyword.map(str::trim).filter(|k| !k.is_empty()).map(str::to_string),
            kind: None,
        }
    }

    pub fn kind(kind: PolicyKind) -> Self {
        Self { keyword: None, kind: Some(kind) }
    }

    pub fn matches(&self, p: &Policy) -> bool {
        if let Some(kind) = self.kind {
            if p.kind != kind {
                return false;
            }
        }
        match &self.keyword {
            Some(k) => p.matches_keyword(k),
            None => true,
        }
    }
}

/// `ip_limit_policy` table.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Assign an id and persist.
    async fn insert(&self, fields: PolicyFields) -> Result<Policy>;
    async fn get(&self, id: PolicyId) -> Result<Option<Policy>>;
    /// Replace an existing record. Returns false if the id is unknown.
    async fn update(&self, policy: Policy) -> Result<bool>;
    async fn delete(&self, id: PolicyId) -> Result<bool>;
    /// Matching policies ordered by id ascending.
    async fn list(&self, filter: &PolicyFilter) -> Result<Vec<Policy>>;
}

/// `ip_limit_policy_api` table, unique on api id.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Point `api_id` at `policy_id`, returning the previous owner if any.
    /// Must be a single keyed write, never read-then-insert.
    async fn upsert_by_api(&self, api_id: ApiId, policy_id: PolicyId) -> Result<Option<PolicyId>>;
    async fn get_by_api(&self, api_id: &ApiId) -> Result<Option<Binding>>;
    async fn delete_by_api(&self, api_id: &ApiId) -> Result<Option<Binding>>;
    /// Remove every binding of the policy, returning the released api ids.
    async fn delete_by_policy(&self, policy_id: PolicyId) -> Result<Vec<ApiId>>;
    async fn count_by_policy(&self, policy_id: PolicyId) -> Result<usize>;
    /// All bindings of the policy ordered by api id.
    async fn all_by_policy(&self, policy_id: PolicyId) -> Result<Vec<Binding>>;
    async fn list_all(&self) -> Result<Vec<Binding>>;

    async fn list_by_policy(&self, policy_id: PolicyId, page: PageParams) -> Result<PageList<Binding>> {
        Ok(PageList::paginate(self.all_by_policy(policy_id).await?, page))
    }
}

/// Read-only view of the API resource catalog.
#[async_trait]
pub trait ApiCatalog: Send + Sync {
    async fn get(&self, api_id: &ApiId) -> Result<Option<ApiSummary>>;
}
