//! IP range parsing and matching.
//!
//! Accepted forms: literal IPv4/IPv6 addresses and CIDR blocks
//! (`addr/prefix`). The submitted string is kept byte-exact because the
//! gateway's matcher parses the same representation. Host bits inside a CIDR
//! block are tolerated and masked off when matching.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{IpLimitError, Result};

/// One parsed whitelist/blacklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpRange {
    raw: String,
    addr: IpAddr,
    prefix: u8,
}

impl IpRange {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(IpLimitError::validation("ip range must not be empty"));
        }
        if raw.trim() != raw {
            return Err(IpLimitError::validation(format!(
                "ip range has surrounding whitespace: {raw:?}"
            )));
        }

        let (addr_s, prefix_s) = match raw.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (raw, None),
        };

        let addr: IpAddr = addr_s
            .parse()
            .map_err(|_| IpLimitError::validation(format!("invalid ip address in range: {raw}")))?;
        let max = max_prefix(addr);

        let prefix = match prefix_s {
            None => max,
            Some(p) => {
                let p: u8 = p
                    .parse()
                    .map_err(|_| IpLimitError::validation(format!("invalid prefix in range: {raw}")))?;
                if p > max {
                    return Err(IpLimitError::validation(format!(
                        "prefix /{p} exceeds /{max} in range: {raw}"
                    )));
                }
                p
            }
        };

        Ok(Self { raw: raw.to_string(), addr, prefix })
    }

    /// Split a delimited list (`;`, `,` or newline) as stored in the legacy
    /// `ipAddress` column. Tokens are trimmed and empty tokens skipped.
    pub fn parse_list(joined: &str) -> Result<Vec<Self>> {
        joined
            .split(|c| c == ';' || c == ',' || c == '\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Whether `ip` falls inside this range. Families never cross-match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(self.prefix)) };
                (u32::from(net) & mask) == (u32::from(ip) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = if self.prefix == 0 { 0 } else { u128::MAX << (128 - u32::from(self.prefix)) };
                (u128::from(net) & mask) == (u128::from(ip) & mask)
            }
            _ => false,
        }
    }
}

fn max_prefix(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for IpRange {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for IpRange {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        IpRange::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// True if any range contains `ip`.
pub fn any_contains(ranges: &[IpRange], ip: IpAddr) -> bool {
    ranges.iter().any(|r| r.contains(ip))
}
