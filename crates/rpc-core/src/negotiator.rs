//! Capability negotiation.

use tracing::trace;

use crate::{RpcVersion, Transport};

/// Answers "can the bound endpoint accept this version?" for one invocation.
///
/// A pure query over the transport's capability predicate, further limited by
/// the client's own pinned version cap: no caching, no retries, no side
/// effects.
#[derive(Clone, Copy)]
pub struct CapabilityNegotiator<'a> {
    transport: &'a dyn Transport,
    version_cap: Option<RpcVersion>,
}

impl<'a> CapabilityNegotiator<'a> {
    /// Binds a negotiator to `transport` with no client-side cap.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            version_cap: None,
        }
    }

    /// Limits negotiation to versions `cap` can carry, whatever the
    /// transport reports.
    pub fn with_version_cap(mut self, cap: Option<RpcVersion>) -> Self {
        self.version_cap = cap;
        self
    }

    /// Returns `true` if `candidate` is within the client cap and supported
    /// by the remote endpoint.
    pub fn supported(&self, candidate: RpcVersion) -> bool {
        let within_cap = self.version_cap.map_or(true, |cap| cap.can_carry(candidate));
        let supported = within_cap && self.transport.can_send_version(candidate);
        trace!(%candidate, within_cap, supported, "Checked remote capability");
        supported
    }
}

impl std::fmt::Debug for CapabilityNegotiator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityNegotiator")
            .field("version_cap", &self.version_cap)
            .finish_non_exhaustive()
    }
}
