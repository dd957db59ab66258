//! The versioned call dispatcher.
//!
//! For each invocation the dispatcher picks the newest schema variant the
//! remote endpoint supports, shapes the arguments for it, and hands the
//! resulting [`Envelope`] to the transport in the operation's delivery mode.
//! It holds no per-call state; concurrent invocations never interact.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, field, warn, Span};

use crate::{
    BinaryName, CapabilityNegotiator, DeliveryMode, Envelope, Gate, OperationPolicy,
    RequestContext, RpcError, RpcVersion, SchemaVariant, Transport,
};

/// Shapes and sends envelopes for a single remote service.
#[derive(Clone)]
pub struct VersionedDispatcher {
    transport: Arc<dyn Transport>,
    binary: BinaryName,
    version_cap: Option<RpcVersion>,
}

impl VersionedDispatcher {
    /// Creates a dispatcher over `transport`. `binary` names the remote
    /// service in operator-facing errors.
    pub fn new(transport: Arc<dyn Transport>, binary: BinaryName) -> Self {
        Self {
            transport,
            binary,
            version_cap: None,
        }
    }

    /// Pins the newest version this dispatcher will negotiate, independently
    /// of what the transport reports.
    pub fn with_version_cap(mut self, cap: Option<RpcVersion>) -> Self {
        self.version_cap = cap;
        self
    }

    /// Client-side version cap, if pinned.
    pub fn version_cap(&self) -> Option<RpcVersion> {
        self.version_cap
    }

    /// Binary name of the remote service.
    pub fn binary(&self) -> &BinaryName {
        &self.binary
    }

    /// Returns a negotiator bound to this dispatcher's transport.
    pub fn negotiator(&self) -> CapabilityNegotiator<'_> {
        CapabilityNegotiator::new(self.transport.as_ref()).with_version_cap(self.version_cap)
    }

    /// Selects the schema variant to use for `policy`.
    ///
    /// Variants are tried newest first. When none of the newer variants is
    /// supported, a soft-fallback policy uses its baseline variant without
    /// asking; a hard-gated policy must confirm the baseline too, and fails
    /// with [`RpcError::ServiceTooOld`] otherwise.
    pub fn select<'p, A>(
        &self,
        policy: &'p OperationPolicy<A>,
    ) -> Result<&'p SchemaVariant<A>, RpcError> {
        let negotiator = self.negotiator();
        let variants = policy.variants();
        let floor = policy.oldest();
        let newer = &variants[..variants.len() - 1];

        if let Some(variant) = newer.iter().find(|v| negotiator.supported(v.min_version)) {
            return Ok(variant);
        }

        match policy.gate() {
            Gate::SoftFallback => {
                if !newer.is_empty() {
                    debug!(
                        operation = %policy.name(),
                        preferred = %policy.newest().min_version,
                        selected = %floor.min_version,
                        "Remote endpoint is older than the newest shape; falling back"
                    );
                }
                Ok(floor)
            }
            Gate::Hard => {
                if negotiator.supported(floor.min_version) {
                    Ok(floor)
                } else {
                    warn!(
                        operation = %policy.name(),
                        minimum = %floor.min_version,
                        binary = %self.binary,
                        "Remote endpoint is too old for this operation"
                    );
                    Err(RpcError::ServiceTooOld {
                        operation: policy.name().clone(),
                        minimum: floor.min_version,
                        binary: self.binary.clone(),
                    })
                }
            }
        }
    }

    /// Builds the envelope for one invocation without sending it.
    ///
    /// The selected version is recorded on the current span's `version`
    /// field when the span declares one.
    pub fn build<A>(&self, policy: &OperationPolicy<A>, args: &A) -> Result<Envelope, RpcError> {
        let variant = self.select(policy)?;
        Span::current().record("version", field::display(variant.min_version));
        let shaped = (variant.shape)(args, variant.min_version)?;
        Ok(Envelope::new(
            variant.method.clone(),
            variant.min_version,
            policy.mode(),
            shaped,
        ))
    }

    /// Shapes and sends one invocation, discarding any reply.
    pub async fn dispatch<A: Sync>(
        &self,
        ctx: &RequestContext,
        policy: &OperationPolicy<A>,
        args: &A,
    ) -> Result<(), RpcError> {
        let envelope = self.build(policy, args)?;
        self.send(ctx, envelope).await.map(|_| ())
    }

    /// Shapes and sends one invocation, decoding the reply as `R`.
    pub async fn dispatch_call<A: Sync, R: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        policy: &OperationPolicy<A>,
        args: &A,
    ) -> Result<R, RpcError> {
        let envelope = self.build(policy, args)?;
        let operation = envelope.method().clone();
        let reply = self.send(ctx, envelope).await?;
        serde_json::from_value(reply).map_err(|source| RpcError::Decode { operation, source })
    }

    async fn send(&self, ctx: &RequestContext, envelope: Envelope) -> Result<Value, RpcError> {
        debug!(
            request_id = %ctx.request_id,
            method = %envelope.method(),
            version = %envelope.version(),
            mode = %envelope.mode(),
            "Dispatching envelope"
        );
        let reply = match envelope.mode() {
            DeliveryMode::Cast => self.transport.cast(ctx, envelope).await.map(|()| Value::Null),
            DeliveryMode::FanoutCast => {
                self.transport.fanout_cast(ctx, envelope).await.map(|()| Value::Null)
            }
            DeliveryMode::Call => self.transport.call(ctx, envelope).await,
        };
        Ok(reply?)
    }
}

impl std::fmt::Debug for VersionedDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedDispatcher")
            .field("binary", &self.binary)
            .field("version_cap", &self.version_cap)
            .finish_non_exhaustive()
    }
}
