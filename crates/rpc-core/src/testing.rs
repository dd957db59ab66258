//! Test doubles for code built on the [`Transport`] port.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::{Clock, Envelope, RequestContext, RpcVersion, Timestamp, Transport, TransportError};

/// A fake [`Transport`] that records every envelope it accepts.
///
/// Capability answers come from a fixed version cap. Sends above the cap are
/// refused with [`TransportError::VersionCap`], mirroring a real transport.
/// Calls reply with a canned value (`null` unless configured). Every send
/// attempt is counted, including refused ones.
#[derive(Debug)]
pub struct RecordingTransport {
    cap: Option<RpcVersion>,
    reply: Value,
    failure: Option<TransportError>,
    sent: Mutex<Vec<(RequestContext, Envelope)>>,
    attempts: AtomicUsize,
}

impl RecordingTransport {
    /// A transport whose endpoints speak at most `cap`.
    pub fn capped(cap: RpcVersion) -> Self {
        Self {
            cap: Some(cap),
            reply: Value::Null,
            failure: None,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// A transport with no version cap.
    pub fn uncapped() -> Self {
        Self {
            cap: None,
            ..Self::capped(RpcVersion::new(0, 0))
        }
    }

    /// Replies to every call with `reply`.
    pub fn with_reply(mut self, reply: Value) -> Self {
        self.reply = reply;
        self
    }

    /// Fails every send with `failure`; nothing is recorded.
    pub fn failing_with(mut self, failure: TransportError) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Envelopes accepted so far, in send order.
    pub fn sent(&self) -> Vec<Envelope> {
        self.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Number of `cast`, `call` and `fanout_cast` invocations so far, whether
    /// or not they were accepted.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Contexts accepted so far, in send order.
    pub fn contexts(&self) -> Vec<RequestContext> {
        self.lock().iter().map(|(c, _)| c.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(RequestContext, Envelope)>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accept(&self, ctx: &RequestContext, envelope: Envelope) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if let Some(cap) = self.cap {
            if !cap.can_carry(envelope.version()) {
                return Err(TransportError::VersionCap {
                    version: envelope.version(),
                    cap,
                });
            }
        }
        self.lock().push((ctx.clone(), envelope));
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn can_send_version(&self, version: RpcVersion) -> bool {
        self.cap.map_or(true, |cap| cap.can_carry(version))
    }

    async fn cast(&self, ctx: &RequestContext, envelope: Envelope) -> Result<(), TransportError> {
        self.accept(ctx, envelope)
    }

    async fn call(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> Result<Value, TransportError> {
        self.accept(ctx, envelope)?;
        Ok(self.reply.clone())
    }

    async fn fanout_cast(
        &self,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> Result<(), TransportError> {
        self.accept(ctx, envelope)
    }
}

/// A [`Clock`] frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
