//! The scheduler client façade.

use std::sync::Arc;

use rpc_core::{
    ClientConfig, Clock, ClusterName, HostName, MonotonicClock, RequestContext, RpcError,
    RpcVersion, ServiceName, Timestamp, Transport, VersionedDispatcher,
};
use tracing::{field, instrument};
use uuid::Uuid;

use crate::objects::{
    Capabilities, ConsistencyGroup, FilterProperties, Group, PoolInfo, Reservations, RequestSpec,
    Volume,
};
use crate::operations::{
    self, CreateConsistencyGroup, CreateGroup, CreateVolume, ExtendVolume, GetPools,
    MigrateVolume, NotifyServiceCapabilities, PlaceVolume, UpdateServiceCapabilities,
};
use crate::versions::RPC_API_VERSION;

/// Client side of the scheduler RPC API.
///
/// Every method picks, per call, the newest message shape the scheduler
/// fleet behind the transport accepts (see [`crate::versions`] for the
/// history). The façade is stateless apart from its clock and may be shared
/// freely between tasks.
///
/// Casts return once the transport has accepted the message; they do not wait
/// for the scheduler to act on it.
pub struct SchedulerApi {
    dispatcher: VersionedDispatcher,
    clock: Arc<dyn Clock>,
}

impl SchedulerApi {
    /// Builds a client over `transport`.
    ///
    /// A pinned `version_cap` limits negotiation even when the transport
    /// would accept newer versions. Addressing (`topic`) belongs to the
    /// transport and is not read here.
    ///
    /// Fails with [`RpcError::Configuration`] if `config` is invalid.
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Result<Self, RpcError> {
        config.validate(RPC_API_VERSION)?;
        Ok(Self {
            dispatcher: VersionedDispatcher::new(transport, config.binary()?)
                .with_version_cap(config.version_cap),
            clock: Arc::new(MonotonicClock::new()),
        })
    }

    /// Replaces the clock used to timestamp capability reports.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns `true` if the scheduler fleet accepts `version`.
    pub fn can_send_version(&self, version: RpcVersion) -> bool {
        self.dispatcher.negotiator().supported(version)
    }

    /// Asks the scheduler to place and create a consistency group.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, group_id = %group.id))]
    pub async fn create_consistencygroup(
        &self,
        ctx: &RequestContext,
        group: &ConsistencyGroup,
        request_spec_list: &[RequestSpec],
        filter_properties_list: Option<&[FilterProperties]>,
    ) -> Result<(), RpcError> {
        let args = CreateConsistencyGroup {
            group,
            request_spec_list,
            filter_properties_list,
        };
        self.dispatcher
            .dispatch(ctx, &operations::create_consistencygroup(), &args)
            .await
    }

    /// Asks the scheduler to place and create a generic volume group.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, group_id = %group.id))]
    pub async fn create_group(
        &self,
        ctx: &RequestContext,
        group: &Group,
        group_spec: Option<&RequestSpec>,
        request_spec_list: &[RequestSpec],
        group_filter_properties: Option<&FilterProperties>,
        filter_properties_list: Option<&[FilterProperties]>,
    ) -> Result<(), RpcError> {
        let args = CreateGroup {
            group,
            group_spec,
            request_spec_list,
            group_filter_properties,
            filter_properties_list,
        };
        self.dispatcher
            .dispatch(ctx, &operations::create_group(), &args)
            .await
    }

    /// Asks the scheduler to place and create a volume.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, volume_id = %volume.id))]
    pub async fn create_volume(
        &self,
        ctx: &RequestContext,
        volume: &Volume,
        snapshot_id: Option<Uuid>,
        image_id: Option<&str>,
        request_spec: Option<&RequestSpec>,
        filter_properties: Option<&FilterProperties>,
    ) -> Result<(), RpcError> {
        let args = CreateVolume {
            volume,
            snapshot_id,
            image_id,
            request_spec,
            filter_properties,
        };
        self.dispatcher
            .dispatch(ctx, &operations::create_volume(), &args)
            .await
    }

    /// Asks the scheduler to migrate a volume to `backend`.
    ///
    /// Schedulers older than 3.3 receive the equivalent
    /// `migrate_volume_to_host` message instead.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, volume_id = %volume.id, backend = %backend))]
    pub async fn migrate_volume(
        &self,
        ctx: &RequestContext,
        volume: &Volume,
        backend: &HostName,
        force_copy: bool,
        request_spec: Option<&RequestSpec>,
        filter_properties: Option<&FilterProperties>,
    ) -> Result<(), RpcError> {
        let args = MigrateVolume {
            volume,
            backend,
            force_copy,
            request_spec,
            filter_properties,
        };
        self.dispatcher
            .dispatch(ctx, &operations::migrate_volume(), &args)
            .await
    }

    /// Asks the scheduler to retype a volume, migrating it if needed.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, volume_id = %volume.id))]
    pub async fn retype(
        &self,
        ctx: &RequestContext,
        volume: &Volume,
        request_spec: Option<&RequestSpec>,
        filter_properties: Option<&FilterProperties>,
    ) -> Result<(), RpcError> {
        let args = PlaceVolume {
            volume,
            request_spec,
            filter_properties,
        };
        self.dispatcher
            .dispatch(ctx, &operations::retype(), &args)
            .await
    }

    /// Asks the scheduler to bring an existing backend volume under management.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, volume_id = %volume.id))]
    pub async fn manage_existing(
        &self,
        ctx: &RequestContext,
        volume: &Volume,
        request_spec: Option<&RequestSpec>,
        filter_properties: Option<&FilterProperties>,
    ) -> Result<(), RpcError> {
        let args = PlaceVolume {
            volume,
            request_spec,
            filter_properties,
        };
        self.dispatcher
            .dispatch(ctx, &operations::manage_existing(), &args)
            .await
    }

    /// Asks the scheduler to check capacity for and extend a volume.
    ///
    /// Requires scheduler RPC API 3.2; older fleets get
    /// [`RpcError::ServiceTooOld`] and nothing is sent.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, volume_id = %volume.id, new_size = new_size))]
    pub async fn extend_volume(
        &self,
        ctx: &RequestContext,
        volume: &Volume,
        new_size: u64,
        reservations: &Reservations,
        request_spec: &RequestSpec,
        filter_properties: Option<&FilterProperties>,
    ) -> Result<(), RpcError> {
        let args = ExtendVolume {
            volume,
            new_size,
            reservations,
            request_spec,
            filter_properties,
        };
        self.dispatcher
            .dispatch(ctx, &operations::extend_volume(), &args)
            .await
    }

    /// Returns the pools known to the scheduler, optionally filtered.
    ///
    /// Waits for the scheduler's reply; the transport owns the timeout.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id))]
    pub async fn get_pools(
        &self,
        ctx: &RequestContext,
        filters: Option<&FilterProperties>,
    ) -> Result<Vec<PoolInfo>, RpcError> {
        let args = GetPools { filters };
        self.dispatcher
            .dispatch_call(ctx, &operations::get_pools(), &args)
            .await
    }

    /// Broadcasts a backend's capabilities to every scheduler.
    ///
    /// From 3.3 the report also carries the cluster name and a timestamp
    /// (`timestamp`, or the current time if `None`); older schedulers receive
    /// the report without either.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, service_name = %service_name, host = %host))]
    pub async fn update_service_capabilities(
        &self,
        ctx: &RequestContext,
        service_name: &ServiceName,
        host: &HostName,
        capabilities: &Capabilities,
        cluster_name: Option<&ClusterName>,
        timestamp: Option<Timestamp>,
    ) -> Result<(), RpcError> {
        let args = UpdateServiceCapabilities {
            service_name,
            host,
            capabilities,
            cluster_name,
            timestamp: timestamp.unwrap_or_else(|| self.clock.now()),
        };
        self.dispatcher
            .dispatch(ctx, &operations::update_service_capabilities(), &args)
            .await
    }

    /// Notifies one scheduler of a backend's capabilities.
    ///
    /// Requires scheduler RPC API 3.1; older fleets get
    /// [`RpcError::ServiceTooOld`] and nothing is sent.
    #[instrument(skip_all, fields(version = field::Empty, request_id = %ctx.request_id, service_name = %service_name, host = %host))]
    pub async fn notify_service_capabilities(
        &self,
        ctx: &RequestContext,
        service_name: &ServiceName,
        host: &HostName,
        capabilities: &Capabilities,
    ) -> Result<(), RpcError> {
        let args = NotifyServiceCapabilities {
            service_name,
            host,
            capabilities,
        };
        self.dispatcher
            .dispatch(ctx, &operations::notify_service_capabilities(), &args)
            .await
    }
}

impl std::fmt::Debug for SchedulerApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerApi")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use rpc_core::testing::{FixedClock, RecordingTransport};
    use rpc_core::{DeliveryMode, Envelope};
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{span, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::*;
    use crate::versions::{V3_0, V3_1, V3_2, V3_3};

    /// Collects every `version` value recorded on a span after creation.
    struct VersionRecorder(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for VersionRecorder {
        fn on_record(&self, _: &span::Id, values: &span::Record<'_>, _: Context<'_, S>) {
            struct Visitor<'a>(&'a mut Vec<String>);

            impl Visit for Visitor<'_> {
                fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "version" {
                        self.0.push(format!("{value:?}"));
                    }
                }
            }

            values.record(&mut Visitor(&mut self.0.lock().unwrap()));
        }
    }

    fn api(transport: &Arc<RecordingTransport>) -> SchedulerApi {
        SchedulerApi::new(transport.clone(), &ClientConfig::default()).unwrap()
    }

    fn volume() -> Volume {
        Volume::new(Uuid::nil(), 1)
    }

    fn host() -> HostName {
        HostName::new("host@lvm").unwrap()
    }

    fn service() -> ServiceName {
        ServiceName::new("volume").unwrap()
    }

    fn only(transport: &RecordingTransport) -> Envelope {
        let mut sent = transport.sent();
        assert_eq!(sent.len(), 1, "expected exactly one envelope");
        sent.remove(0)
    }

    async fn announce(api: &SchedulerApi, timestamp: Option<Timestamp>) {
        api.update_service_capabilities(
            &RequestContext::admin(),
            &service(),
            &host(),
            &Map::new(),
            Some(&ClusterName::new("cluster@lvm").unwrap()),
            timestamp,
        )
        .await
        .unwrap();
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let transport = Arc::new(RecordingTransport::uncapped());
        let config = ClientConfig {
            version_cap: Some(RpcVersion::new(3, 4)),
            ..ClientConfig::default()
        };
        assert!(matches!(
            SchedulerApi::new(transport, &config),
            Err(RpcError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_migrate_volume_on_3_0_uses_legacy_shape() {
        let transport = Arc::new(RecordingTransport::capped(V3_0));
        api(&transport)
            .migrate_volume(&RequestContext::new(), &volume(), &HostName::new("backendA").unwrap(), true, None, None)
            .await
            .unwrap();

        let envelope = only(&transport);
        assert_eq!(envelope.method().as_str(), "migrate_volume_to_host");
        assert_eq!(envelope.version(), V3_0);
        assert_eq!(envelope.mode(), DeliveryMode::Cast);
        assert_eq!(envelope.arg("host"), Some(&json!("backendA")));
        assert_eq!(envelope.arg("force_host_copy"), Some(&json!(true)));
        assert!(envelope.arg("backend").is_none());
    }

    #[tokio::test]
    async fn test_configured_cap_limits_an_uncapped_transport() {
        let transport = Arc::new(RecordingTransport::uncapped());
        let config = ClientConfig {
            version_cap: Some(V3_0),
            ..ClientConfig::default()
        };
        let api = SchedulerApi::new(transport.clone(), &config).unwrap();
        assert!(!api.can_send_version(V3_3));

        api.migrate_volume(&RequestContext::new(), &volume(), &HostName::new("backendA").unwrap(), true, None, None)
            .await
            .unwrap();
        let envelope = only(&transport);
        assert_eq!(envelope.method().as_str(), "migrate_volume_to_host");
        assert_eq!(envelope.version(), V3_0);

        let err = api
            .extend_volume(&RequestContext::new(), &volume(), 2, &vec![], &RequestSpec::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::ServiceTooOld { minimum, .. } if minimum == V3_2));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_span_records_selected_version() {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(VersionRecorder(recorded.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Arc::new(RecordingTransport::capped(V3_0));
        api(&transport)
            .migrate_volume(&RequestContext::new(), &volume(), &HostName::new("backendA").unwrap(), true, None, None)
            .await
            .unwrap();
        let transport = Arc::new(RecordingTransport::capped(V3_3));
        api(&transport)
            .migrate_volume(&RequestContext::new(), &volume(), &HostName::new("backendA").unwrap(), true, None, None)
            .await
            .unwrap();

        assert_eq!(*recorded.lock().unwrap(), ["3.0", "3.3"]);
    }

    #[tokio::test]
    async fn test_migrate_volume_on_3_3_uses_cluster_shape() {
        let transport = Arc::new(RecordingTransport::capped(V3_3));
        api(&transport)
            .migrate_volume(&RequestContext::new(), &volume(), &HostName::new("backendA").unwrap(), true, None, None)
            .await
            .unwrap();

        let envelope = only(&transport);
        assert_eq!(envelope.method().as_str(), "migrate_volume");
        assert_eq!(envelope.version(), V3_3);
        assert_eq!(envelope.arg("backend"), Some(&json!("backendA")));
        assert_eq!(envelope.arg("force_copy"), Some(&json!(true)));
        assert!(envelope.arg("host").is_none());
    }

    #[tokio::test]
    async fn test_extend_volume_below_3_2_sends_nothing() {
        let transport = Arc::new(RecordingTransport::capped(V3_1));
        let err = api(&transport)
            .extend_volume(&RequestContext::new(), &volume(), 2, &vec![], &RequestSpec::default(), None)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "extend_volume requires cinder-scheduler RPC API version >= 3.2."
        );
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_extend_volume_on_3_2() {
        let transport = Arc::new(RecordingTransport::capped(V3_2));
        let reservations = vec!["r1".to_string()];
        api(&transport)
            .extend_volume(&RequestContext::new(), &volume(), 2, &reservations, &RequestSpec::default(), None)
            .await
            .unwrap();

        let envelope = only(&transport);
        assert_eq!(envelope.version(), V3_2);
        assert_eq!(envelope.arg("new_size"), Some(&json!(2)));
        assert_eq!(envelope.arg("reservations"), Some(&json!(["r1"])));
    }

    #[tokio::test]
    async fn test_notify_service_capabilities_boundary() {
        let transport = Arc::new(RecordingTransport::capped(V3_1));
        api(&transport)
            .notify_service_capabilities(&RequestContext::admin(), &service(), &host(), &Map::new())
            .await
            .unwrap();
        assert_eq!(only(&transport).version(), V3_1);

        let old = Arc::new(RecordingTransport::capped(V3_0));
        let err = api(&old)
            .notify_service_capabilities(&RequestContext::admin(), &service(), &host(), &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::ServiceTooOld { minimum, .. } if minimum == V3_1));
        assert_eq!(old.attempts(), 0);
    }

    #[tokio::test]
    async fn test_update_capabilities_on_3_3_carries_cluster_and_timestamp() {
        let at = Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        let transport = Arc::new(RecordingTransport::capped(V3_3));
        let api = api(&transport).with_clock(Arc::new(FixedClock(at)));
        announce(&api, None).await;

        let envelope = only(&transport);
        assert_eq!(envelope.mode(), DeliveryMode::FanoutCast);
        assert_eq!(envelope.version(), V3_3);
        assert_eq!(envelope.arg("cluster_name"), Some(&json!("cluster@lvm")));
        assert_eq!(envelope.arg("timestamp"), Some(&serde_json::to_value(at).unwrap()));
    }

    #[tokio::test]
    async fn test_update_capabilities_prefers_explicit_timestamp() {
        let explicit = Timestamp::from_utc(Utc.with_ymd_and_hms(2020, 5, 5, 0, 0, 0).unwrap());
        let transport = Arc::new(RecordingTransport::capped(V3_3));
        announce(&api(&transport), Some(explicit)).await;
        assert_eq!(
            only(&transport).arg("timestamp"),
            Some(&serde_json::to_value(explicit).unwrap())
        );
    }

    #[tokio::test]
    async fn test_update_capabilities_default_timestamp_is_recent_and_non_decreasing() {
        let transport = Arc::new(RecordingTransport::capped(V3_3));
        let api = api(&transport);
        let before = Utc::now();
        for _ in 0..5 {
            announce(&api, None).await;
        }

        let stamps: Vec<Timestamp> = transport
            .sent()
            .iter()
            .map(|e| serde_json::from_value(e.arg("timestamp").cloned().unwrap()).unwrap())
            .collect();
        assert_eq!(stamps.len(), 5);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        let delta = stamps[0].as_datetime() - before;
        assert!(delta >= ChronoDuration::zero() - ChronoDuration::milliseconds(1));
        assert!(delta < ChronoDuration::seconds(5));
    }

    #[tokio::test]
    async fn test_update_capabilities_below_3_3_omits_cluster_and_timestamp() {
        let transport = Arc::new(RecordingTransport::capped(V3_2));
        announce(&api(&transport), None).await;

        let envelope = only(&transport);
        assert_eq!(envelope.version(), V3_0);
        assert_eq!(envelope.mode(), DeliveryMode::FanoutCast);
        assert!(envelope.arg("timestamp").is_none());
        assert!(envelope.arg("cluster_name").is_none());
        assert_eq!(envelope.arg("service_name"), Some(&json!("volume")));
    }

    #[tokio::test]
    async fn test_get_pools_is_a_call_and_decodes_pools() {
        let reply = json!([{"name": "host@lvm#pool", "capabilities": {"free_capacity_gb": 10}}]);
        let transport = Arc::new(RecordingTransport::capped(V3_3).with_reply(reply));
        let mut filters = Map::new();
        filters.insert("name".into(), json!("host@lvm#pool"));

        let pools = api(&transport)
            .get_pools(&RequestContext::admin(), Some(&filters))
            .await
            .unwrap();

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name, "host@lvm#pool");
        assert_eq!(pools[0].capabilities["free_capacity_gb"], json!(10));
        let envelope = only(&transport);
        assert_eq!(envelope.mode(), DeliveryMode::Call);
        assert_eq!(envelope.version(), V3_0);
        assert_eq!(envelope.arg("filters"), Some(&Value::Object(filters)));
    }

    #[tokio::test]
    async fn test_baseline_operations_are_stamped_3_0() {
        let transport = Arc::new(RecordingTransport::capped(V3_3));
        let api = api(&transport);
        let ctx = RequestContext::new();
        let vol = volume();
        let spec = RequestSpec::default();
        let group = Group {
            id: Uuid::nil(),
            name: None,
            group_type_id: None,
            volume_type_ids: vec![],
            availability_zone: None,
        };
        let cg = ConsistencyGroup {
            id: Uuid::nil(),
            name: Some("cg".into()),
            volume_type: None,
            availability_zone: None,
        };

        api.create_volume(&ctx, &vol, None, Some("image-1"), Some(&spec), None).await.unwrap();
        api.retype(&ctx, &vol, Some(&spec), None).await.unwrap();
        api.manage_existing(&ctx, &vol, None, None).await.unwrap();
        api.create_group(&ctx, &group, None, &[spec.clone()], None, None).await.unwrap();
        api.create_consistencygroup(&ctx, &cg, &[spec.clone()], None).await.unwrap();

        let sent = transport.sent();
        let methods: Vec<&str> = sent.iter().map(|e| e.method().as_str()).collect();
        assert_eq!(
            methods,
            ["create_volume", "retype", "manage_existing", "create_group", "create_consistencygroup"]
        );
        assert!(sent.iter().all(|e| e.version() == V3_0 && e.mode() == DeliveryMode::Cast));
        assert_eq!(sent[0].arg("image_id"), Some(&json!("image-1")));
        assert_eq!(sent[0].arg("snapshot_id"), Some(&Value::Null));
        assert_eq!(sent[4].arg("request_spec_list").and_then(Value::as_array).map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_identical_inputs_build_identical_arguments() {
        let at = Timestamp::from_utc(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let transport = Arc::new(RecordingTransport::capped(V3_3));
        let api = api(&transport).with_clock(Arc::new(FixedClock(at)));
        announce(&api, None).await;
        announce(&api, None).await;

        let sent = transport.sent();
        assert_eq!(
            serde_json::to_vec(sent[0].args()).unwrap(),
            serde_json::to_vec(sent[1].args()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_context_is_forwarded_to_the_transport() {
        let transport = Arc::new(RecordingTransport::uncapped());
        let ctx = RequestContext::new().with_user("u", "p");
        api(&transport).retype(&ctx, &volume(), None, None).await.unwrap();
        assert_eq!(transport.contexts(), vec![ctx]);
    }
}
