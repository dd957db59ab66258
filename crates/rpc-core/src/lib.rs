//! Version-negotiated RPC client core.
//!
//! This crate contains everything a versioned RPC façade needs that is not
//! specific to one remote service: the ordered [`RpcVersion`] type, call
//! [`Envelope`]s and the primitive codec, the [`Transport`] port, the
//! [`CapabilityNegotiator`], declarative per-operation schema tables, and the
//! [`VersionedDispatcher`] that ties them together.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies.
//! Transports are supplied by infrastructure crates (see the `bus` crate);
//! façades for concrete services live in their own crates (see `scheduler`).
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype names (`Topic`, `OperationName`, `HostName`, etc.) |
//! | [`types`] | `RpcVersion`, `DeliveryMode`, `Timestamp` |
//! | [`errors`] | `RpcError`, `TransportError`, `RetryPolicy` |
//! | [`context`] | `RequestContext` |
//! | [`envelope`] | `Envelope`, `ArgumentMap`, the primitive codec |
//! | [`transport`] | The `Transport` port trait |
//! | [`negotiator`] | `CapabilityNegotiator` |
//! | [`schema`] | `OperationPolicy`, `SchemaVariant`, `Gate` |
//! | [`dispatcher`] | `VersionedDispatcher` |
//! | [`clock`] | `Clock`, `MonotonicClock` |
//! | [`config`] | `ClientConfig` |

pub mod clock;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod identifiers;
pub mod negotiator;
pub mod schema;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use clock::{Clock, MonotonicClock};
pub use config::ClientConfig;
pub use context::RequestContext;
pub use dispatcher::VersionedDispatcher;
pub use envelope::{to_primitive, ArgsBuilder, ArgumentMap, Envelope};
pub use errors::{RetryPolicy, RpcError, TransportError};
pub use identifiers::{
    BinaryName, ClusterName, HostName, OperationName, RequestId, ServerName, ServiceName, Topic,
};
pub use negotiator::CapabilityNegotiator;
pub use schema::{Gate, OperationPolicy, SchemaVariant, ShapeFn};
pub use transport::Transport;
pub use types::{DeliveryMode, RpcVersion, Timestamp, VersionParseError};
