//! Error and retry-policy types for the RPC client layer.
//!
//! [`RpcError`] is what every façade operation returns. It separates
//! protocol-incompatibility failures raised before anything is sent
//! ([`RpcError::ServiceTooOld`]) from failures reported by the transport
//! ([`RpcError::Transport`]), which are passed through untouched.
//!
//! [`RetryPolicy`] is a cross-cutting concern: every error type here can tell
//! the caller whether re-issuing the same request may succeed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BinaryName, OperationName, RpcVersion, Topic};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// ## Rules
///
/// - `Retryable` errors: reply timeouts, lost connections, no listeners yet.
/// - `NonRetryable` errors: service too old, version cap exceeded, codec
///   failures, invalid configuration, errors raised by the remote handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without operator action.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`crate::Transport`] implementation.
///
/// The dispatcher never creates these; it only propagates them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The envelope's version is above the version cap the transport was
    /// configured with.
    #[error("Requested message version {version} is incompatible with the version cap {cap}")]
    VersionCap {
        /// Version stamped on the rejected envelope.
        version: RpcVersion,
        /// Cap configured on the transport.
        cap: RpcVersion,
    },

    /// Nobody is listening on the topic.
    #[error("No endpoints are listening on topic '{topic}'")]
    NoListeners {
        /// The topic the envelope was addressed to.
        topic: Topic,
    },

    /// The connection to the endpoint dropped before the exchange completed.
    #[error("Connection lost: {reason}")]
    ConnectionLost {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// No reply arrived within the transport's call timeout.
    #[error("Timed out after {after:?} waiting for a reply")]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The remote handler processed the request and reported a failure.
    #[error("Remote error: {message}")]
    Remote {
        /// Error text returned by the remote endpoint.
        message: String,
    },
}

impl TransportError {
    /// Returns the retry policy for this error.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Timeout { .. } | Self::ConnectionLost { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            Self::NoListeners { .. } => RetryPolicy::Retryable {
                after: Some(Duration::from_secs(1)),
            },
            Self::VersionCap { .. } | Self::Remote { .. } => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

/// Errors returned by versioned RPC client operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The remote service cannot accept any message shape this operation
    /// has; it must be upgraded first.
    ///
    /// Raised synchronously, before any envelope reaches the transport.
    #[error("{operation} requires {binary} RPC API version >= {minimum}.")]
    ServiceTooOld {
        /// Logical operation that was rejected.
        operation: OperationName,
        /// Oldest version at which the operation exists.
        minimum: RpcVersion,
        /// Binary name of the remote service, for the operator message.
        binary: BinaryName,
    },

    /// The transport failed; propagated unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An argument could not be converted to its primitive wire form.
    #[error("Could not encode arguments for '{operation}': {source}")]
    Encode {
        /// Operation whose arguments were being built.
        operation: OperationName,
        /// Underlying codec error.
        #[source]
        source: serde_json::Error,
    },

    /// A reply could not be decoded into the operation's reply type.
    #[error("Could not decode reply from '{operation}': {source}")]
    Decode {
        /// Operation whose reply was being decoded.
        operation: OperationName,
        /// Underlying codec error.
        #[source]
        source: serde_json::Error,
    },

    /// The client configuration is invalid.
    ///
    /// Produced at construction time; a client never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl RpcError {
    /// Returns the retry policy for this error.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport(err) => err.retry_policy(),
            Self::ServiceTooOld { .. }
            | Self::Encode { .. }
            | Self::Decode { .. }
            | Self::Configuration { .. } => RetryPolicy::NonRetryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_too_old_message_names_operation_and_minimum() {
        let err = RpcError::ServiceTooOld {
            operation: OperationName::from_static("extend_volume"),
            minimum: RpcVersion::new(3, 2),
            binary: BinaryName::new("cinder-scheduler").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "extend_volume requires cinder-scheduler RPC API version >= 3.2."
        );
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn test_transport_errors_pass_through_transparently() {
        let inner = TransportError::Timeout {
            after: Duration::from_secs(5),
        };
        let err = RpcError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.retry_policy(), RetryPolicy::Retryable { after: None });
    }

    #[test]
    fn test_version_cap_is_not_retryable() {
        let err = TransportError::VersionCap {
            version: RpcVersion::new(3, 3),
            cap: RpcVersion::new(3, 0),
        };
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }
}
