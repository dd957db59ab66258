//! Client configuration.
//!
//! Loaded by the composition root (see the `cli` crate) and validated before
//! any client is built; a client never starts with an invalid configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::{BinaryName, RpcError, RpcVersion, Topic};

const DEFAULT_TOPIC: &str = "cinder-scheduler";
const DEFAULT_BINARY: &str = "cinder-scheduler";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Settings for one versioned RPC client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    /// Topic the remote service listens on.
    pub topic: String,

    /// Binary name of the remote service, used in operator messages.
    pub binary: String,

    /// Pinned maximum version the remote fleet accepts (e.g. `"3.0"` during a
    /// rolling upgrade). `None` means no cap.
    pub version_cap: Option<RpcVersion>,

    /// How long a request/reply call may wait for its reply.
    pub call_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            binary: DEFAULT_BINARY.to_string(),
            version_cap: None,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, RpcError> {
        serde_json::from_str(text).map_err(|e| RpcError::Configuration {
            message: format!("could not parse client configuration: {e}"),
        })
    }

    /// Checks the configuration against the newest version the client can
    /// build (`client_max`).
    pub fn validate(&self, client_max: RpcVersion) -> Result<(), RpcError> {
        if self.topic.trim().is_empty() {
            return Err(config_error("topic must not be empty"));
        }
        if self.binary.trim().is_empty() {
            return Err(config_error("binary must not be empty"));
        }
        if self.call_timeout_secs == 0 {
            return Err(config_error("call_timeout_secs must be greater than zero"));
        }
        if let Some(cap) = self.version_cap {
            if cap > client_max {
                return Err(config_error(format!(
                    "version_cap {cap} is newer than the newest version this client speaks ({client_max})"
                )));
            }
        }
        Ok(())
    }

    /// The topic as a validated identifier.
    pub fn topic(&self) -> Result<Topic, RpcError> {
        Topic::new(self.topic.clone()).ok_or_else(|| config_error("topic must not be empty"))
    }

    /// The binary name as a validated identifier.
    pub fn binary(&self) -> Result<BinaryName, RpcError> {
        BinaryName::new(self.binary.clone()).ok_or_else(|| config_error("binary must not be empty"))
    }

    /// The call timeout as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn config_error(message: impl Into<String>) -> RpcError {
    RpcError::Configuration {
        message: message.into(),
    }
}
