//! A stand-in scheduler endpoint for the demo.
//!
//! Logs every delivery it receives and answers `get_pools` from a fixed pool
//! list. Real schedulers run in their own process behind a real transport.

use bus::{Delivery, Subscription};
use scheduler::PoolInfo;
use tracing::{info, warn};

/// Serves deliveries until the bus goes away.
pub async fn serve(mut sub: Subscription, pools: Vec<PoolInfo>) {
    while let Some(delivery) = sub.recv().await {
        handle(sub.server().as_str(), delivery, &pools);
    }
}

fn handle(server: &str, delivery: Delivery, pools: &[PoolInfo]) {
    let envelope = &delivery.envelope;
    info!(
        server,
        request_id = %delivery.ctx.request_id,
        method = %envelope.method(),
        version = %envelope.version(),
        mode = %envelope.mode(),
        args = ?envelope.args().keys().collect::<Vec<_>>(),
        "Scheduler received message"
    );

    if !delivery.expects_reply() {
        return;
    }
    let reply = match envelope.method().as_str() {
        "get_pools" => serde_json::to_value(pools).map_err(|e| e.to_string()),
        other => Err(format!("unsupported call '{other}'")),
    };
    if !delivery.reply(reply) {
        warn!(server, "Caller stopped waiting before the reply was sent");
    }
}
