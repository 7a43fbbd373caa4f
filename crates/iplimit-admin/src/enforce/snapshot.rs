use std::collections::HashMap;
use std::net::IpAddr;

use iplimit_core::error::Result;
use iplimit_core::model::ip_range::any_contains;
use iplimit_core::model::{ApiId, IpRange, PolicyId, PolicyKind};

use crate::store::{BindingStore, PolicyFilter, PolicyStore};

/// Decision from access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Pass,
    Deny { policy_id: PolicyId, kind: PolicyKind },
}

impl AccessDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Pass => "pass",
            AccessDecision::Deny { .. } => "deny",
        }
    }
}

/// Compiled rule for one API.
#[derive(Debug, Clone)]
pub struct AccessRule {
    pub policy_id: PolicyId,
    pub kind: PolicyKind,
    pub ranges: Vec<IpRange>,
}

impl AccessRule {
    pub fn decide(&self, ip: IpAddr) -> AccessDecision {
        let hit = any_contains(&self.ranges, ip);
        let allowed = match self.kind {
            PolicyKind::Whitelist => hit,
            PolicyKind::Blacklist => !hit,
        };
        if allowed {
            AccessDecision::Pass
        } else {
            AccessDecision::Deny { policy_id: self.policy_id, kind: self.kind }
        }
    }
}

/// Immutable api -> rule table. Rebuilt wholesale, never patched.
#[derive(Debug, Default)]
pub struct AccessSnapshot {
    seq: u64,
    rules: HashMap<ApiId, AccessRule>,
}

impl AccessSnapshot {
    /// Compile every binding whose policy is enabled.
    pub async fn build(
        seq: u64,
        policies: &dyn PolicyStore,
        bindings: &dyn BindingStore,
    ) -> Result<Self> {
        let enabled: HashMap<PolicyId, (PolicyKind, Vec<IpRange>)> = policies
            .list(&PolicyFilter::default())
            .await?
            .into_iter()
            .filter(|p| p.is_enabled())
            .map(|p| (p.id, (p.kind, p.ip_ranges)))
            .collect();

        let mut rules = HashMap::new();
        for b in bindings.list_all().await? {
            // bindings of disabled policies compile to nothing
            let Some((kind, ranges)) = enabled.get(&b.policy_id) else { continue };
            rules.insert(
                b.api_id,
                AccessRule { policy_id: b.policy_id, kind: *kind, ranges: ranges.clone() },
            );
        }

        Ok(Self { seq, rules })
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, api_id: &ApiId) -> Option<&AccessRule> {
        self.rules.get(api_id)
    }

    /// Unbound APIs are unrestricted.
    pub fn decide(&self, api_id: &ApiId, ip: IpAddr) -> AccessDecision {
        match self.rules.get(api_id) {
            Some(rule) => rule.decide(ip),
            None => AccessDecision::Pass,
        }
    }
}
