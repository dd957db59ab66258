//! Scheduler RPC demo entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration** — read a JSON [`ClientConfig`] from the file named
//!    by `SCHEDULER_RPC_CONFIG`, or use defaults, and validate it.
//! 2. **Wire logging** — install a `tracing-subscriber` formatter filtered by
//!    `RUST_LOG`; `SCHEDULER_RPC_LOG_FORMAT=json` switches to JSON output.
//! 3. **Construct infrastructure** — build the in-process [`MessageBus`], a
//!    [`BusClient`] capped at the configured version, and the
//!    [`SchedulerApi`] façade over it.
//! 4. **Run the demo** — start two stand-in scheduler endpoints and issue one
//!    of each kind of scheduler request, showing which message shape the
//!    configured version cap produces.

mod endpoint;

use std::sync::Arc;

use anyhow::Context;
use bus::{BusClient, MessageBus};
use rpc_core::{
    ClientConfig, ClusterName, HostName, RequestContext, RpcError, ServerName, ServiceName,
};
use scheduler::{PoolInfo, RequestSpec, SchedulerApi, Volume, RPC_API_VERSION};
use serde_json::{json, Map};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const CONFIG_ENV: &str = "SCHEDULER_RPC_CONFIG";
const LOG_FORMAT_ENV: &str = "SCHEDULER_RPC_LOG_FORMAT";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config() -> anyhow::Result<ClientConfig> {
    let config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.to_string_lossy()))?;
            ClientConfig::from_json(&text)?
        }
        None => ClientConfig::default(),
    };
    config.validate(RPC_API_VERSION)?;
    Ok(config)
}

fn demo_pools() -> Vec<PoolInfo> {
    let mut capabilities = Map::new();
    capabilities.insert("total_capacity_gb".into(), json!(1024));
    capabilities.insert("free_capacity_gb".into(), json!(512));
    vec![PoolInfo {
        name: "demo@lvm#pool".to_string(),
        capabilities,
    }]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let config = load_config()?;
    info!(
        topic = %config.topic,
        version_cap = ?config.version_cap.map(|v| v.to_string()),
        "Starting scheduler RPC demo"
    );

    let bus = MessageBus::new();
    let topic = config.topic()?;
    for name in ["scheduler-a", "scheduler-b"] {
        let server = ServerName::new(name).context("server name")?;
        tokio::spawn(endpoint::serve(
            bus.subscribe(topic.clone(), server),
            demo_pools(),
        ));
    }

    let transport = BusClient::from_config(bus.clone(), &config)?;
    let api = SchedulerApi::new(Arc::new(transport), &config)?;

    let ctx = RequestContext::admin();
    let volume = Volume::new(Uuid::new_v4(), 10);
    let spec = RequestSpec {
        volume_id: Some(volume.id),
        ..RequestSpec::default()
    };
    let backend = HostName::new("demo@lvm").context("host name")?;

    api.create_volume(&ctx, &volume, None, None, Some(&spec), None)
        .await?;
    api.migrate_volume(&ctx, &volume, &backend, false, Some(&spec), None)
        .await?;

    match api
        .extend_volume(&ctx, &volume, 20, &Vec::new(), &spec, None)
        .await
    {
        Ok(()) => {}
        Err(err @ RpcError::ServiceTooOld { .. }) => warn!(%err, "Skipping volume extension"),
        Err(err) => return Err(err.into()),
    }

    let service = ServiceName::new("volume").context("service name")?;
    let cluster = ClusterName::new("demo-cluster@lvm").context("cluster name")?;
    api.update_service_capabilities(&ctx, &service, &backend, &Map::new(), Some(&cluster), None)
        .await?;

    let pools = api.get_pools(&ctx, None).await?;
    for pool in &pools {
        info!(pool = %pool.name, capabilities = %serde_json::Value::Object(pool.capabilities.clone()), "Pool");
    }

    // Let the endpoints drain their queues before the runtime shuts down.
    tokio::task::yield_now().await;
    Ok(())
}
