use serde::Deserialize;

use iplimit_core::error::{IpLimitError, Result};
use iplimit_core::model::page::MAX_PAGE_LIMIT;
use iplimit_core::model::ApiSummary;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub paging: PagingSection,

    #[serde(default)]
    pub notifier: NotifierSection,

    #[serde(default)]
    pub policy: PolicySection,

    #[serde(default)]
    pub catalog: CatalogSection,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(IpLimitError::UnsupportedVersion);
        }

        self.paging.validate()?;
        self.notifier.validate()?;
        self.catalog.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8211".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PagingSection {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for PagingSection {
    fn default() -> Self {
        Self { default_limit: default_limit(), max_limit: default_max_limit() }
    }
}

impl PagingSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PAGE_LIMIT).contains(&self.max_limit) {
            return Err(IpLimitError::BadRequest(format!(
                "paging.max_limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(IpLimitError::BadRequest(
                "paging.default_limit must be between 1 and paging.max_limit".into(),
            ));
        }
        Ok(())
    }
}

fn default_limit() -> u32 {
    10
}
fn default_max_limit() -> u32 {
    MAX_PAGE_LIMIT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifierMode {
    None,
    #[default]
    Log,
    Http,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierSection {
    #[serde(default)]
    pub mode: NotifierMode,

    /// Gateway refresh endpoints, one POST per endpoint per change.
    #[serde(default)]
    pub endpoints: Vec<String>,

    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NotifierSection {
    fn default() -> Self {
        Self {
            mode: NotifierMode::default(),
            endpoints: Vec::new(),
            timeout_ms: default_notify_timeout_ms(),
        }
    }
}

impl NotifierSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=30000).contains(&self.timeout_ms) {
            return Err(IpLimitError::BadRequest(
                "notifier.timeout_ms must be between 100 and 30000".into(),
            ));
        }
        if self.mode == NotifierMode::Http && self.endpoints.is_empty() {
            return Err(IpLimitError::BadRequest(
                "notifier.endpoints must not be empty when mode is http".into(),
            ));
        }
        for ep in &self.endpoints {
            if !(ep.starts_with("http://") || ep.starts_with("https://")) {
                return Err(IpLimitError::BadRequest(format!(
                    "notifier endpoint must be an http(s) url: {ep}"
                )));
            }
        }
        Ok(())
    }
}

fn default_notify_timeout_ms() -> u64 {
    3000
}

/// What `updatePolicy` does when the submitted kind differs from the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KindChangeMode {
    #[default]
    Reject,
    Warn,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    #[serde(default)]
    pub kind_change: KindChangeMode,
}

/// API metadata seeded into the in-memory resource catalog.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CatalogSection {
    #[serde(default)]
    pub apis: Vec<ApiSummary>,
}

impl CatalogSection {
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for api in &self.apis {
            if api.api_id.as_str().trim().is_empty() {
                return Err(IpLimitError::BadRequest("catalog api id must not be blank".into()));
            }
            if !seen.insert(api.api_id.as_str()) {
                return Err(IpLimitError::BadRequest(format!(
                    "duplicate catalog api id: {}",
                    api.api_id
                )));
            }
        }
        Ok(())
    }
}
