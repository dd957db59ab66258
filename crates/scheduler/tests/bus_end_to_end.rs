//! Drives `SchedulerApi` over the in-process bus against fake scheduler
//! endpoints.

use std::sync::Arc;

use bus::{BusClient, Delivery, MessageBus};
use rpc_core::{
    ClientConfig, HostName, RequestContext, RpcError, RpcVersion, ServerName, ServiceName, Topic,
    TransportError,
};
use scheduler::{RequestSpec, SchedulerApi, Volume, TOPIC};
use serde_json::{json, Map};
use tokio::sync::mpsc;
use uuid::Uuid;

fn topic() -> Topic {
    Topic::new(TOPIC).unwrap()
}

/// Subscribes a scheduler endpoint that answers `get_pools` and forwards
/// every delivery it sees to the returned channel.
fn spawn_scheduler(bus: &MessageBus, name: &str) -> mpsc::UnboundedReceiver<(String, Delivery)> {
    let mut sub = bus.subscribe(topic(), ServerName::new(name).unwrap());
    let name = name.to_string();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(delivery) = sub.recv().await {
            if delivery.envelope.method().as_str() == "get_pools" {
                let pools = json!([{"name": format!("{name}@lvm#pool"), "capabilities": {}}]);
                delivery.reply(Ok(pools));
            } else {
                let _ = seen_tx.send((name.clone(), delivery));
            }
        }
    });
    seen_rx
}

fn api(bus: &MessageBus, cap: Option<&str>) -> SchedulerApi {
    let config = ClientConfig {
        version_cap: cap.map(|c| c.parse::<RpcVersion>().unwrap()),
        call_timeout_secs: 5,
        ..ClientConfig::default()
    };
    let transport = BusClient::from_config(bus.clone(), &config).unwrap();
    SchedulerApi::new(Arc::new(transport), &config).unwrap()
}

#[tokio::test]
async fn migrate_volume_on_a_3_0_fleet_reaches_the_scheduler_in_legacy_form() {
    let bus = MessageBus::new();
    let mut seen = spawn_scheduler(&bus, "sched-1");
    let api = api(&bus, Some("3.0"));

    let volume = Volume::new(Uuid::new_v4(), 5);
    api.migrate_volume(
        &RequestContext::new(),
        &volume,
        &HostName::new("backendA").unwrap(),
        true,
        None,
        None,
    )
    .await
    .unwrap();

    let (_, delivery) = seen.recv().await.unwrap();
    assert_eq!(delivery.envelope.method().as_str(), "migrate_volume_to_host");
    assert_eq!(delivery.envelope.version(), RpcVersion::new(3, 0));
    assert_eq!(delivery.envelope.arg("host"), Some(&json!("backendA")));
    assert_eq!(delivery.envelope.arg("force_host_copy"), Some(&json!(true)));
}

#[tokio::test]
async fn migrate_volume_on_a_3_3_fleet_uses_the_backend_form() {
    let bus = MessageBus::new();
    let mut seen = spawn_scheduler(&bus, "sched-1");
    let api = api(&bus, Some("3.3"));

    let volume = Volume::new(Uuid::new_v4(), 5);
    api.migrate_volume(
        &RequestContext::new(),
        &volume,
        &HostName::new("backendA").unwrap(),
        true,
        None,
        None,
    )
    .await
    .unwrap();

    let (_, delivery) = seen.recv().await.unwrap();
    assert_eq!(delivery.envelope.method().as_str(), "migrate_volume");
    assert_eq!(delivery.envelope.version(), RpcVersion::new(3, 3));
    assert_eq!(delivery.envelope.arg("backend"), Some(&json!("backendA")));
    assert_eq!(delivery.envelope.arg("force_copy"), Some(&json!(true)));
}

#[tokio::test]
async fn capability_announcements_reach_every_scheduler() {
    let bus = MessageBus::new();
    let mut first = spawn_scheduler(&bus, "sched-1");
    let mut second = spawn_scheduler(&bus, "sched-2");
    let api = api(&bus, None);

    api.update_service_capabilities(
        &RequestContext::admin(),
        &ServiceName::new("volume").unwrap(),
        &HostName::new("host@lvm").unwrap(),
        &Map::new(),
        None,
        None,
    )
    .await
    .unwrap();

    for seen in [&mut first, &mut second] {
        let (_, delivery) = seen.recv().await.unwrap();
        assert_eq!(delivery.envelope.method().as_str(), "update_service_capabilities");
        assert!(delivery.envelope.arg("timestamp").is_some());
        assert_eq!(delivery.envelope.arg("cluster_name"), Some(&json!(null)));
    }
}

#[tokio::test]
async fn get_pools_waits_for_the_scheduler_reply() {
    let bus = MessageBus::new();
    let _seen = spawn_scheduler(&bus, "sched-1");
    let api = api(&bus, None);

    let pools = api.get_pools(&RequestContext::admin(), None).await.unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].name, "sched-1@lvm#pool");
}

#[tokio::test]
async fn extend_volume_on_an_old_fleet_is_rejected_before_sending() {
    let bus = MessageBus::new();
    let mut seen = spawn_scheduler(&bus, "sched-1");
    let api = api(&bus, Some("3.1"));

    let err = api
        .extend_volume(
            &RequestContext::new(),
            &Volume::new(Uuid::new_v4(), 5),
            10,
            &vec![],
            &RequestSpec::default(),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::ServiceTooOld { .. }));

    // A follow-up cast is the first thing the scheduler sees.
    api.retype(&RequestContext::new(), &Volume::new(Uuid::new_v4(), 5), None, None)
        .await
        .unwrap();
    let (_, delivery) = seen.recv().await.unwrap();
    assert_eq!(delivery.envelope.method().as_str(), "retype");
}

#[tokio::test]
async fn casts_without_a_scheduler_surface_the_transport_error() {
    let bus = MessageBus::new();
    let api = api(&bus, None);

    let err = api
        .retype(&RequestContext::new(), &Volume::new(Uuid::new_v4(), 5), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RpcError::Transport(TransportError::NoListeners { .. })
    ));
}
