//! In-process message bus.
//!
//! Implements the [`rpc_core::Transport`] trait over tokio channels, so that a
//! versioned client façade and the endpoints it addresses can run in one
//! process (tests, demos, single-node deployments).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Topic routing, endpoint selection, reply correlation,
//! call timeouts and version-cap enforcement all live here. Façades see only
//! [`rpc_core::Transport`].
//!
//! ## Delivery
//!
//! | Mode | Routing |
//! |------|---------|
//! | cast | one endpoint on the topic, round-robin |
//! | call | one endpoint on the topic, round-robin; waits for its reply |
//! | fanout cast | every endpoint on the topic |

pub mod bus;
pub mod client;

pub use bus::{Delivery, MessageBus, Reply, Subscription};
pub use client::BusClient;
