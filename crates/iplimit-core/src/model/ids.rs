use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IpLimitError, Result};

/// Store-assigned policy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub u64);

impl PolicyId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an API resource owned by the resource catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiId(String);

impl ApiId {
    /// Accepts any non-blank id; the value is kept verbatim.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(IpLimitError::validation("api id must not be blank"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApiId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Parse a batch of raw ids, failing on the first blank entry.
pub fn parse_api_ids<I, S>(raw: I) -> Result<Vec<ApiId>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    raw.into_iter().map(ApiId::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_id_rejected() {
        assert!(ApiId::parse("  ").is_err());
        assert_eq!(ApiId::parse("api-1").map(|a| a.to_string()).ok().as_deref(), Some("api-1"));
    }

    #[test]
    fn batch_stops_on_blank() {
        let err = parse_api_ids(["a", "", "b"]).err();
        assert!(matches!(err, Some(IpLimitError::Validation(_))));
    }
}
