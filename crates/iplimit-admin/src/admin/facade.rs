//! Admin-facing operations, named the way the management console calls them.
//!
//! Thin layer over `PolicyEngine`: applies paging defaults and counts
//! mutation outcomes. No policy rules live here.

use std::sync::Arc;

use iplimit_core::error::Result;
use iplimit_core::model::{
    ApiId, BoundApi, PageList, PageParams, Policy, PolicyDraft, PolicyId, PolicyKind,
    PolicyWithApis,
};

use crate::config::PagingSection;
use crate::engine::{Committed, PolicyEngine};
use crate::obs::AdminMetrics;

pub struct IpLimitService {
    engine: Arc<PolicyEngine>,
    default_limit: u32,
    max_limit: u32,
    metrics: Arc<AdminMetrics>,
}

impl IpLimitService {
    pub fn new(engine: Arc<PolicyEngine>, paging: &PagingSection, metrics: Arc<AdminMetrics>) -> Self {
        Self {
            engine,
            default_limit: paging.default_limit,
            max_limit: paging.max_limit,
            metrics,
        }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn page_params(&self, page: Option<u32>, limit: Option<u32>) -> PageParams {
        PageParams::new(page, limit, self.default_limit, self.max_limit)
    }

    pub async fn find_list_page(&self, page: PageParams, keyword: Option<&str>) -> Result<PageList<Policy>> {
        self.engine.list_policies_page(page, keyword).await
    }

    pub async fn find_white_list(&self, page: PageParams) -> Result<PageList<PolicyWithApis>> {
        self.engine.list_by_kind(PolicyKind::Whitelist, page).await
    }

    pub async fn find_black_list(&self, page: PageParams) -> Result<PageList<PolicyWithApis>> {
        self.engine.list_by_kind(PolicyKind::Blacklist, page).await
    }

    pub async fn find_ip_limit_api_list(&self, policy_id: PolicyId, page: PageParams) -> Result<PageList<BoundApi>> {
        self.engine.list_apis_for_policy(policy_id, page).await
    }

    pub async fn get_ip_limit_policy(&self, policy_id: PolicyId) -> Result<Policy> {
        self.engine.get_policy(policy_id).await
    }

    pub async fn add_ip_limit_policy(&self, draft: PolicyDraft) -> Result<Committed<PolicyId>> {
        self.count("add_policy", self.engine.add_policy(draft).await)
    }

    pub async fn update_ip_limit_policy(&self, policy_id: PolicyId, draft: PolicyDraft) -> Result<Committed<()>> {
        self.count("update_policy", self.engine.update_policy(policy_id, draft).await)
    }

    pub async fn remove_ip_limit_policy(&self, policy_id: PolicyId) -> Result<Committed<()>> {
        self.count("remove_policy", self.engine.remove_policy(policy_id).await)
    }

    pub async fn add_ip_limit_apis(&self, policy_id: PolicyId, api_ids: Vec<ApiId>) -> Result<Committed<()>> {
        self.count("bind", self.engine.bind(policy_id, api_ids).await)
    }

    pub async fn replace_ip_limit_apis(&self, policy_id: PolicyId, api_ids: Vec<ApiId>) -> Result<Committed<()>> {
        self.count("replace_apis", self.engine.replace_apis(policy_id, api_ids).await)
    }

    pub async fn clear_ip_limit_apis_by_policy_id(&self, policy_id: PolicyId) -> Result<Committed<usize>> {
        self.count("clear_by_policy", self.engine.clear_by_policy(policy_id).await)
    }

    pub async fn clear_ip_limit_apis_by_api_id(&self, api_id: &ApiId) -> Result<Committed<bool>> {
        self.count("clear_by_api", self.engine.clear_by_api(api_id).await)
    }

    fn count<T>(&self, op: &str, res: Result<Committed<T>>) -> Result<Committed<T>> {
        let result = match &res {
            Ok(c) if c.is_propagated() => "ok",
            Ok(_) => "ok_unpropagated",
            Err(e) => e.client_code().as_str(),
        };
        self.metrics.mutations.inc(&[("op", op), ("result", result)]);
        res
    }
}
