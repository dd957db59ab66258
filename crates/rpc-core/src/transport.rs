//! The transport port.
//!
//! A [`Transport`] moves envelopes to the endpoints of one topic. It owns
//! routing, serialisation, timeouts and retries; the dispatcher only decides
//! *what* to send and *which* delivery mode to use.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{Envelope, RequestContext, RpcVersion, TransportError};

/// A topic-bound message transport.
///
/// Implementations must be safe to share between concurrent invocations;
/// connection pooling and reuse are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns `true` if the endpoints behind this transport can accept a
    /// message stamped with `version`.
    ///
    /// The answer is a snapshot: it may change between invocations as the
    /// fleet upgrades, but callers treat it as fixed for one invocation.
    fn can_send_version(&self, version: RpcVersion) -> bool;

    /// Fire-and-forget delivery to one endpoint.
    ///
    /// Returns once the envelope has been accepted for delivery.
    async fn cast(&self, ctx: &RequestContext, envelope: Envelope) -> Result<(), TransportError>;

    /// Request/reply delivery to one endpoint. Resolves with the remote
    /// reply, or fails with a transport or remote error.
    async fn call(&self, ctx: &RequestContext, envelope: Envelope)
        -> Result<Value, TransportError>;

    /// Fire-and-forget delivery to every endpoint on the topic.
    async fn fanout_cast(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn can_send_version(&self, version: RpcVersion) -> bool {
        (**self).can_send_version(version)
    }

    async fn cast(&self, ctx: &RequestContext, envelope: Envelope) -> Result<(), TransportError> {
        (**self).cast(ctx, envelope).await
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> Result<Value, TransportError> {
        (**self).call(ctx, envelope).await
    }

    async fn fanout_cast(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> Result<(), TransportError> {
        (**self).fanout_cast(ctx, envelope).await
    }
}
