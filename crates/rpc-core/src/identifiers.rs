//! Newtype identifiers used on the RPC boundary.
//!
//! Every name that crosses the bus (topics, operation names, hosts, clusters)
//! is a distinct newtype wrapping a string. This prevents accidentally passing
//! a [`HostName`] where a [`ClusterName`] is expected even though both are
//! strings on the wire.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Operation names
// ---------------------------------------------------------------------------

/// The wire method name of a remote operation (e.g. `"migrate_volume"`).
///
/// Operation names are almost always compile-time constants taken from a
/// façade's policy table, so the common constructor is the `const`
/// [`OperationName::from_static`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationName(Cow<'static, str>);

impl OperationName {
    /// Wraps a static method name without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates an operation name from an owned string, returning `None` if empty.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let n = name.into();
        if n.is_empty() {
            None
        } else {
            Some(Self(Cow::Owned(n)))
        }
    }

    /// Returns the method name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OperationName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one logical request as it travels across services.
///
/// Generated fresh for every [`crate::RequestContext`]; propagated in the
/// context so that logs on both sides of the bus can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`RequestId`] from an existing UUID (e.g. received from a peer).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (configuration / routing names)
// ---------------------------------------------------------------------------

string_id! {
    /// A bus topic that addresses every endpoint of one service
    /// (e.g. `"cinder-scheduler"`).
    Topic
}

string_id! {
    /// The binary name of a remote service, used in operator-facing messages
    /// such as "requires cinder-scheduler RPC API version >= 3.2".
    BinaryName
}

string_id! {
    /// Identifies a single endpoint (server) listening on a topic.
    ServerName
}

string_id! {
    /// Names a service that announces its capabilities (e.g. `"volume"`).
    ServiceName
}

string_id! {
    /// A backend host identifier, in `host@backend#pool` form where applicable.
    HostName
}

string_id! {
    /// Identifies a cluster of hosts that share a backend.
    ClusterName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_ids_reject_empty_values() {
        assert!(Topic::new("").is_none());
        assert!(HostName::new("").is_none());
        assert_eq!(Topic::new("cinder-scheduler").unwrap().as_str(), "cinder-scheduler");
    }

    #[test]
    fn test_operation_name_serialises_as_plain_string() {
        let op = OperationName::from_static("get_pools");
        assert_eq!(serde_json::to_value(&op).unwrap(), serde_json::json!("get_pools"));
        assert_eq!(OperationName::new("get_pools"), Some(op));
        assert!(OperationName::new("").is_none());
    }

    #[test]
    fn test_request_id_display_is_prefixed() {
        let id = RequestId::from_uuid(Uuid::nil());
        assert_eq!(id.to_string(), "req-00000000-0000-0000-0000-000000000000");
    }
}
