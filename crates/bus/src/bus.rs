//! Topic routing and endpoint subscriptions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rpc_core::{Envelope, RequestContext, ServerName, Topic, TransportError};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// Per-endpoint queue depth; senders wait once an endpoint falls this far behind.
const ENDPOINT_QUEUE_DEPTH: usize = 256;

/// Outcome of a call as reported by the endpoint: a reply value or the
/// endpoint's error text.
pub type Reply = Result<Value, String>;

// ---------------------------------------------------------------------------

/// One envelope as received by an endpoint.
#[derive(Debug)]
pub struct Delivery {
    /// Caller context sent with the envelope.
    pub ctx: RequestContext,
    /// The envelope.
    pub envelope: Envelope,
    reply_to: Option<oneshot::Sender<Reply>>,
}

impl Delivery {
    /// Returns `true` if the sender is waiting for a reply.
    pub fn expects_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Answers a call. Returns `false` if the delivery was not a call or the
    /// caller stopped waiting.
    pub fn reply(self, reply: Reply) -> bool {
        match self.reply_to {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------

/// Receiving side of one endpoint.
///
/// Dropping the subscription removes the endpoint from its topic.
#[derive(Debug)]
pub struct Subscription {
    server: ServerName,
    rx: mpsc::Receiver<Delivery>,
}

impl Subscription {
    /// Name the endpoint subscribed under.
    pub fn server(&self) -> &ServerName {
        &self.server
    }

    /// Waits for the next delivery. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Returns the next delivery if one is already queued.
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok()
    }
}

// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Endpoint {
    server: ServerName,
    tx: mpsc::Sender<Delivery>,
}

#[derive(Debug, Default)]
struct TopicState {
    endpoints: Vec<Endpoint>,
    next: usize,
}

impl TopicState {
    fn prune(&mut self) {
        self.endpoints.retain(|e| !e.tx.is_closed());
    }
}

/// A cheaply cloneable handle to one in-process bus.
#[derive(Debug, Clone, Default)]
pub struct MessageBus {
    topics: Arc<Mutex<HashMap<Topic, TopicState>>>,
}

impl MessageBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an endpoint named `server` on `topic`.
    pub fn subscribe(&self, topic: Topic, server: ServerName) -> Subscription {
        let (tx, rx) = mpsc::channel(ENDPOINT_QUEUE_DEPTH);
        debug!(%topic, %server, "Endpoint subscribed");
        self.topics.lock().entry(topic).or_default().endpoints.push(Endpoint {
            server: server.clone(),
            tx,
        });
        Subscription { server, rx }
    }

    /// Number of live endpoints on `topic`.
    pub fn endpoint_count(&self, topic: &Topic) -> usize {
        let mut topics = self.topics.lock();
        match topics.get_mut(topic) {
            Some(state) => {
                state.prune();
                state.endpoints.len()
            }
            None => 0,
        }
    }

    /// Picks the next endpoint on `topic`, round-robin.
    fn next_endpoint(&self, topic: &Topic) -> Option<(ServerName, mpsc::Sender<Delivery>)> {
        let mut topics = self.topics.lock();
        let state = topics.get_mut(topic)?;
        state.prune();
        if state.endpoints.is_empty() {
            return None;
        }
        let index = state.next % state.endpoints.len();
        state.next = state.next.wrapping_add(1);
        let endpoint = &state.endpoints[index];
        Some((endpoint.server.clone(), endpoint.tx.clone()))
    }

    /// Every live endpoint on `topic`.
    fn all_endpoints(&self, topic: &Topic) -> Vec<(ServerName, mpsc::Sender<Delivery>)> {
        let mut topics = self.topics.lock();
        match topics.get_mut(topic) {
            Some(state) => {
                state.prune();
                state
                    .endpoints
                    .iter()
                    .map(|e| (e.server.clone(), e.tx.clone()))
                    .collect()
            }
            None => Vec::new(),
        }
    }

    /// Sends to one endpoint. `reply_to` is set for calls.
    pub(crate) async fn send_one(
        &self,
        topic: &Topic,
        ctx: &RequestContext,
        envelope: Envelope,
        reply_to: Option<oneshot::Sender<Reply>>,
    ) -> Result<(), TransportError> {
        let (server, tx) = self
            .next_endpoint(topic)
            .ok_or_else(|| TransportError::NoListeners {
                topic: topic.clone(),
            })?;
        trace!(%topic, %server, method = %envelope.method(), "Routing envelope");
        let delivery = Delivery {
            ctx: ctx.clone(),
            envelope,
            reply_to,
        };
        tx.send(delivery)
            .await
            .map_err(|_| TransportError::ConnectionLost {
                reason: format!("endpoint '{server}' on '{topic}' went away"),
            })
    }

    /// Sends a copy to every endpoint. Returns how many endpoints accepted it.
    pub(crate) async fn send_all(
        &self,
        topic: &Topic,
        ctx: &RequestContext,
        envelope: Envelope,
    ) -> usize {
        let mut delivered = 0;
        for (server, tx) in self.all_endpoints(topic) {
            let delivery = Delivery {
                ctx: ctx.clone(),
                envelope: envelope.clone(),
                reply_to: None,
            };
            if tx.send(delivery).await.is_ok() {
                delivered += 1;
            } else {
                trace!(%topic, %server, "Endpoint went away during fanout");
            }
        }
        delivered
    }
}
