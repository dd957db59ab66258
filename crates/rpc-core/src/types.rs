//! Shared value types for the RPC domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with an ordering or a wire representation that the dispatcher
//! reasons about (versions are compared, timestamps are serialised).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Version of a service's RPC API.
///
/// Additive changes bump `minor`; breaking changes bump `major`. Within one
/// major version every endpoint at minor `k` understands every message shape
/// defined at minor `k` or lower.
///
/// Ordering is numeric on `(major, minor)`, so `3.10 > 3.9`. On the wire and in
/// configuration a version is written as the string `"<major>.<minor>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RpcVersion {
    /// Major version — bumped on breaking changes.
    pub major: u32,
    /// Minor version — bumped on additive changes.
    pub minor: u32,
}

impl RpcVersion {
    /// Creates a new [`RpcVersion`].
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns `true` if an endpoint speaking `self` can accept a message
    /// stamped with `other`.
    ///
    /// Compatibility requires the same major version and `self.minor >= other.minor`.
    pub fn can_carry(self, other: RpcVersion) -> bool {
        self.major == other.major && self.minor >= other.minor
    }
}

impl std::fmt::Display for RpcVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A version string could not be parsed as `"<major>.<minor>"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid RPC version '{input}': expected '<major>.<minor>'")]
pub struct VersionParseError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for RpcVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError {
            input: s.to_string(),
        };
        let (major, minor) = s.trim().split_once('.').ok_or_else(err)?;
        let major = major.parse::<u32>().map_err(|_| err())?;
        let minor = minor.parse::<u32>().map_err(|_| err())?;
        Ok(Self::new(major, minor))
    }
}

impl TryFrom<String> for RpcVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RpcVersion> for String {
    fn from(version: RpcVersion) -> Self {
        version.to_string()
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// How an envelope is handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Fire-and-forget to one endpoint on the topic. Success means "accepted
    /// for delivery", not "processed".
    Cast,
    /// Request/reply to one endpoint; the caller waits for the reply.
    Call,
    /// Fire-and-forget to every endpoint listening on the topic.
    FanoutCast,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cast => "cast",
            Self::Call => "call",
            Self::FanoutCast => "fanout_cast",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Serialises as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering_is_numeric_not_lexicographic() {
        let v3_9: RpcVersion = "3.9".parse().unwrap();
        let v3_10: RpcVersion = "3.10".parse().unwrap();
        assert!(v3_10 > v3_9);
        assert!(RpcVersion::new(4, 0) > v3_10);
    }

    #[test]
    fn test_version_parse_rejects_malformed_input() {
        for bad in ["", "3", "3.", ".1", "3.x", "3.1.2", "-1.0"] {
            assert!(bad.parse::<RpcVersion>().is_err(), "accepted {bad:?}");
        }
        assert_eq!(" 3.3 ".parse::<RpcVersion>().unwrap(), RpcVersion::new(3, 3));
    }

    #[test]
    fn test_can_carry_requires_same_major() {
        let cap = RpcVersion::new(3, 3);
        assert!(cap.can_carry(RpcVersion::new(3, 0)));
        assert!(cap.can_carry(RpcVersion::new(3, 3)));
        assert!(!cap.can_carry(RpcVersion::new(3, 4)));
        assert!(!cap.can_carry(RpcVersion::new(2, 3)));
        assert!(!RpcVersion::new(2, 9).can_carry(RpcVersion::new(3, 0)));
    }

    #[test]
    fn test_version_serialises_as_string() {
        let v = RpcVersion::new(3, 1);
        assert_eq!(serde_json::to_value(v).unwrap(), serde_json::json!("3.1"));
        let back: RpcVersion = serde_json::from_value(serde_json::json!("3.1")).unwrap();
        assert_eq!(back, v);
        assert!(serde_json::from_value::<RpcVersion>(serde_json::json!("three")).is_err());
    }

    #[test]
    fn test_delivery_mode_display() {
        assert_eq!(DeliveryMode::FanoutCast.to_string(), "fanout_cast");
        assert_eq!(DeliveryMode::Call.to_string(), "call");
    }
}
