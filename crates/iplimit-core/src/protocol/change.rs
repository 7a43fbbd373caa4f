//! `ConfigChange` wire format (JSON).

use serde::{Deserialize, Serialize};

use crate::error::{IpLimitError, Result};
use crate::model::{ApiId, PolicyId};

pub const PROTOCOL_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    PolicyAdded,
    PolicyUpdated,
    PolicyRemoved,
    ApisBound,
    ApisReplaced,
    ApisClearedByPolicy,
    ApiCleared,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::PolicyAdded => "policy_added",
            ChangeKind::PolicyUpdated => "policy_updated",
            ChangeKind::PolicyRemoved => "policy_removed",
            ChangeKind::ApisBound => "apis_bound",
            ChangeKind::ApisReplaced => "apis_replaced",
            ChangeKind::ApisClearedByPolicy => "apis_cleared_by_policy",
            ChangeKind::ApiCleared => "api_cleared",
        }
    }
}

/// Summary of one committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigChange {
    /// Protocol version.
    pub v: u8,
    /// Monotonic per-engine sequence; receivers may drop stale pushes.
    pub seq: u64,
    pub kind: ChangeKind,
    /// Policy the change is about. `None` only for `api_cleared`.
    #[serde(default)]
    pub policy_id: Option<PolicyId>,
    /// APIs whose effective policy may have changed.
    #[serde(default)]
    pub api_ids: Vec<ApiId>,
    /// Policies that lost APIs to this change (bind overwrite).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub released_from: Vec<PolicyId>,
}

impl ConfigChange {
    pub fn new(seq: u64, kind: ChangeKind, policy_id: Option<PolicyId>) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            seq,
            kind,
            policy_id,
            api_ids: Vec::new(),
            released_from: Vec::new(),
        }
    }

    pub fn with_apis(mut self, api_ids: Vec<ApiId>) -> Self {
        self.api_ids = api_ids;
        self
    }

    pub fn with_released(mut self, released_from: Vec<PolicyId>) -> Self {
        self.released_from = released_from;
        self
    }
}

pub fn encode_change(change: &ConfigChange) -> Result<String> {
    serde_json::to_string(change)
        .map_err(|e| IpLimitError::Internal(format!("encode config change failed: {e}")))
}

pub fn decode_change(raw: &str) -> Result<ConfigChange> {
    let change: ConfigChange = serde_json::from_str(raw)
        .map_err(|e| IpLimitError::BadRequest(format!("invalid config change: {e}")))?;
    if change.v != PROTOCOL_VERSION {
        return Err(IpLimitError::UnsupportedVersion);
    }
    if change.policy_id.is_none() && change.kind != ChangeKind::ApiCleared {
        return Err(IpLimitError::BadRequest(format!(
            "{} requires policy_id",
            change.kind.as_str()
        )));
    }
    Ok(change)
}
