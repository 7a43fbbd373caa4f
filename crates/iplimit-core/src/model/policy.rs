//! Policy records and their validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{IpLimitError, Result};
use crate::model::ids::{ApiId, PolicyId};
use crate::model::ip_range::IpRange;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyKind {
    /// Only listed ranges may call a bound API.
    Whitelist,
    /// Listed ranges are refused; everyone else passes.
    Blacklist,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Whitelist => "WHITELIST",
            PolicyKind::Blacklist => "BLACKLIST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    #[default]
    Enabled,
    Disabled,
}

/// Range input as accepted from clients: a JSON array or the legacy
/// delimited string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RangesInput {
    List(Vec<String>),
    Joined(String),
}

impl Default for RangesInput {
    fn default() -> Self {
        RangesInput::List(Vec::new())
    }
}

impl RangesInput {
    fn parse(&self) -> Result<Vec<IpRange>> {
        match self {
            RangesInput::List(items) => items.iter().map(|s| IpRange::parse(s)).collect(),
            RangesInput::Joined(joined) => IpRange::parse_list(joined),
        }
    }
}

impl From<Vec<&str>> for RangesInput {
    fn from(v: Vec<&str>) -> Self {
        RangesInput::List(v.into_iter().map(str::to_string).collect())
    }
}

/// Unvalidated policy submission (create or update body).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PolicyDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: PolicyKind,
    #[serde(default)]
    pub ip_ranges: RangesInput,
    #[serde(default)]
    pub status: PolicyStatus,
}

impl PolicyDraft {
    pub fn new(name: impl Into<String>, kind: PolicyKind, ranges: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            kind,
            ip_ranges: ranges.into(),
            status: PolicyStatus::Enabled,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: PolicyStatus) -> Self {
        self.status = status;
        self
    }

    /// Check required fields and parse every range.
    pub fn validate(&self) -> Result<PolicyFields> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(IpLimitError::validation("policy name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(IpLimitError::validation(format!(
                "policy name longer than {MAX_NAME_LEN} characters"
            )));
        }

        let ranges = self.ip_ranges.parse()?;
        if ranges.is_empty() {
            return Err(IpLimitError::validation("ipRanges must not be empty"));
        }
        let mut seen = HashSet::with_capacity(ranges.len());
        for r in &ranges {
            if !seen.insert(r.as_str()) {
                return Err(IpLimitError::validation(format!("duplicate ip range: {r}")));
            }
        }

        Ok(PolicyFields {
            name: name.to_string(),
            description: self.description.clone(),
            kind: self.kind,
            ip_ranges: ranges,
            status: self.status,
        })
    }
}

/// Validated policy content, everything but the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyFields {
    pub name: String,
    pub description: String,
    pub kind: PolicyKind,
    pub ip_ranges: Vec<IpRange>,
    pub status: PolicyStatus,
}

/// Persisted policy (`ip_limit_policy` row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,
    pub description: String,
    pub kind: PolicyKind,
    pub ip_ranges: Vec<IpRange>,
    pub status: PolicyStatus,
}

impl Policy {
    pub fn from_fields(id: PolicyId, f: PolicyFields) -> Self {
        Self {
            id,
            name: f.name,
            description: f.description,
            kind: f.kind,
            ip_ranges: f.ip_ranges,
            status: f.status,
        }
    }

    pub fn fields(&self) -> PolicyFields {
        PolicyFields {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind,
            ip_ranges: self.ip_ranges.clone(),
            status: self.status,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == PolicyStatus::Enabled
    }

    /// Case-insensitive substring match on name or description.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let k = keyword.to_lowercase();
        self.name.to_lowercase().contains(&k) || self.description.to_lowercase().contains(&k)
    }
}

/// `ip_limit_policy_api` row: api -> policy, unique on api.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub api_id: ApiId,
    pub policy_id: PolicyId,
}

/// API resource metadata from the resource catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiSummary {
    pub api_id: ApiId,
    #[serde(default)]
    pub api_name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub service_id: String,
}

/// Binding decorated with catalog metadata when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundApi {
    #[serde(flatten)]
    pub binding: Binding,
    pub api: Option<ApiSummary>,
}

/// Whitelist/blacklist projection: policy joined with its bound APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyWithApis {
    #[serde(flatten)]
    pub policy: Policy,
    pub apis: Vec<BoundApi>,
}

impl PolicyWithApis {
    pub fn api_count(&self) -> usize {
        self.apis.len()
    }
}
