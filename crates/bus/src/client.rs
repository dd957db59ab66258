//! The [`Transport`] implementation over a [`MessageBus`].

use std::time::Duration;

use async_trait::async_trait;
use rpc_core::{
    ClientConfig, Envelope, RequestContext, RpcError, RpcVersion, Topic, Transport,
    TransportError,
};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::MessageBus;

/// A client bound to one topic of a [`MessageBus`].
///
/// The optional version cap models the fleet's upgrade level: envelopes
/// stamped with a version the cap cannot carry are refused with
/// [`TransportError::VersionCap`].
#[derive(Debug, Clone)]
pub struct BusClient {
    bus: MessageBus,
    topic: Topic,
    version_cap: Option<RpcVersion>,
    call_timeout: Duration,
}

impl BusClient {
    /// Creates a client for `topic`.
    pub fn new(
        bus: MessageBus,
        topic: Topic,
        version_cap: Option<RpcVersion>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            topic,
            version_cap,
            call_timeout,
        }
    }

    /// Creates a client from validated configuration.
    pub fn from_config(bus: MessageBus, config: &ClientConfig) -> Result<Self, RpcError> {
        Ok(Self::new(
            bus,
            config.topic()?,
            config.version_cap,
            config.call_timeout(),
        ))
    }

    /// Topic this client sends to.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    fn check_cap(&self, envelope: &Envelope) -> Result<(), TransportError> {
        match self.version_cap {
            Some(cap) if !cap.can_carry(envelope.version()) => Err(TransportError::VersionCap {
                version: envelope.version(),
                cap,
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for BusClient {
    fn can_send_version(&self, version: RpcVersion) -> bool {
        self.version_cap.map_or(true, |cap| cap.can_carry(version))
    }

    async fn cast(&self, ctx: &RequestContext, envelope: Envelope) -> Result<(), TransportError> {
        self.check_cap(&envelope)?;
        self.bus.send_one(&self.topic, ctx, envelope, None).await
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> Result<Value, TransportError> {
        self.check_cap(&envelope)?;
        let (tx, rx) = oneshot::channel();
        self.bus.send_one(&self.topic, ctx, envelope, Some(tx)).await?;

        match tokio::time::timeout(self.call_timeout, rx).await {
            Err(_) => Err(TransportError::Timeout {
                after: self.call_timeout,
            }),
            Ok(Err(_)) => Err(TransportError::ConnectionLost {
                reason: format!("endpoint on '{}' dropped the call without replying", self.topic),
            }),
            Ok(Ok(Err(message))) => Err(TransportError::Remote { message }),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }

    async fn fanout_cast(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> Result<(), TransportError> {
        self.check_cap(&envelope)?;
        let delivered = self.bus.send_all(&self.topic, ctx, envelope).await;
        debug!(topic = %self.topic, delivered, "Fanout cast delivered");
        Ok(())
    }
}
