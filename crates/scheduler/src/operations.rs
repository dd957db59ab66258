//! The scheduler's wire policy table.
//!
//! One argument struct and one [`OperationPolicy`] per logical operation.
//! Shape functions are pure: they read only the call arguments and return the
//! primitive argument map for their variant.

use rpc_core::{
    ArgsBuilder, ArgumentMap, ClusterName, HostName, OperationPolicy, RpcError, RpcVersion,
    SchemaVariant, ServiceName, Timestamp,
};
use uuid::Uuid;

use crate::objects::{
    Capabilities, ConsistencyGroup, FilterProperties, Group, Reservations, RequestSpec, Volume,
};
use crate::versions::{V3_0, V3_1, V3_2, V3_3};

// ---------------------------------------------------------------------------
// Wire method names
// ---------------------------------------------------------------------------

/// Wire method names understood by the scheduler.
pub mod method {
    /// Places and creates a consistency group.
    pub const CREATE_CONSISTENCYGROUP: &str = "create_consistencygroup";
    /// Places and creates a generic volume group.
    pub const CREATE_GROUP: &str = "create_group";
    /// Places and creates a volume.
    pub const CREATE_VOLUME: &str = "create_volume";
    /// Migrates a volume to a backend (3.3 and later).
    pub const MIGRATE_VOLUME: &str = "migrate_volume";
    /// Migrates a volume to a host (before 3.3).
    pub const MIGRATE_VOLUME_TO_HOST: &str = "migrate_volume_to_host";
    /// Re-places a volume after a type change.
    pub const RETYPE: &str = "retype";
    /// Places a volume being brought under management.
    pub const MANAGE_EXISTING: &str = "manage_existing";
    /// Checks capacity for and grows a volume (3.2 and later).
    pub const EXTEND_VOLUME: &str = "extend_volume";
    /// Lists the scheduler's pools.
    pub const GET_POOLS: &str = "get_pools";
    /// Broadcasts a backend's capability report.
    pub const UPDATE_SERVICE_CAPABILITIES: &str = "update_service_capabilities";
    /// Sends a capability report for notification (3.1 and later).
    pub const NOTIFY_SERVICE_CAPABILITIES: &str = "notify_service_capabilities";
}

// ---------------------------------------------------------------------------
// create_consistencygroup
// ---------------------------------------------------------------------------

/// Arguments of [`create_consistencygroup`].
pub struct CreateConsistencyGroup<'a> {
    pub group: &'a ConsistencyGroup,
    pub request_spec_list: &'a [RequestSpec],
    /// One filter set per request spec, if any.
    pub filter_properties_list: Option<&'a [FilterProperties]>,
}

fn create_consistencygroup_v3_0(
    args: &CreateConsistencyGroup<'_>,
    _: RpcVersion,
) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::CREATE_CONSISTENCYGROUP)
        .arg("group", args.group)?
        .arg("request_spec_list", args.request_spec_list)?
        .arg("filter_properties_list", &args.filter_properties_list)?
        .build())
}

/// Baseline cast, unchanged since 3.0.
pub fn create_consistencygroup<'a>() -> OperationPolicy<CreateConsistencyGroup<'a>> {
    OperationPolicy::cast(
        method::CREATE_CONSISTENCYGROUP,
        SchemaVariant::new(V3_0, method::CREATE_CONSISTENCYGROUP, create_consistencygroup_v3_0),
    )
}

// ---------------------------------------------------------------------------
// create_group
// ---------------------------------------------------------------------------

/// Arguments of [`create_group`].
pub struct CreateGroup<'a> {
    pub group: &'a Group,
    /// Group-level request spec.
    pub group_spec: Option<&'a RequestSpec>,
    pub request_spec_list: &'a [RequestSpec],
    pub group_filter_properties: Option<&'a FilterProperties>,
    /// One filter set per request spec, if any.
    pub filter_properties_list: Option<&'a [FilterProperties]>,
}

fn create_group_v3_0(args: &CreateGroup<'_>, _: RpcVersion) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::CREATE_GROUP)
        .arg("group", args.group)?
        .arg("group_spec", &args.group_spec)?
        .arg("request_spec_list", args.request_spec_list)?
        .arg("group_filter_properties", &args.group_filter_properties)?
        .arg("filter_properties_list", &args.filter_properties_list)?
        .build())
}

/// Baseline cast, unchanged since 3.0.
pub fn create_group<'a>() -> OperationPolicy<CreateGroup<'a>> {
    OperationPolicy::cast(
        method::CREATE_GROUP,
        SchemaVariant::new(V3_0, method::CREATE_GROUP, create_group_v3_0),
    )
}

// ---------------------------------------------------------------------------
// create_volume
// ---------------------------------------------------------------------------

/// Arguments of [`create_volume`].
pub struct CreateVolume<'a> {
    pub volume: &'a Volume,
    pub snapshot_id: Option<Uuid>,
    pub image_id: Option<&'a str>,
    pub request_spec: Option<&'a RequestSpec>,
    pub filter_properties: Option<&'a FilterProperties>,
}

fn create_volume_v3_0(args: &CreateVolume<'_>, _: RpcVersion) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::CREATE_VOLUME)
        .arg("snapshot_id", &args.snapshot_id)?
        .arg("image_id", &args.image_id)?
        .arg("request_spec", &args.request_spec)?
        .arg("filter_properties", &args.filter_properties)?
        .arg("volume", args.volume)?
        .build())
}

/// Baseline cast, unchanged since 3.0.
pub fn create_volume<'a>() -> OperationPolicy<CreateVolume<'a>> {
    OperationPolicy::cast(
        method::CREATE_VOLUME,
        SchemaVariant::new(V3_0, method::CREATE_VOLUME, create_volume_v3_0),
    )
}

// ---------------------------------------------------------------------------
// migrate_volume (soft fallback to migrate_volume_to_host)
// ---------------------------------------------------------------------------

/// Arguments of [`migrate_volume`].
pub struct MigrateVolume<'a> {
    pub volume: &'a Volume,
    /// Destination backend; sent as `host` before 3.3.
    pub backend: &'a HostName,
    /// Copy the data even if the driver could move it directly.
    pub force_copy: bool,
    pub request_spec: Option<&'a RequestSpec>,
    pub filter_properties: Option<&'a FilterProperties>,
}

fn migrate_volume_v3_3(args: &MigrateVolume<'_>, _: RpcVersion) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::MIGRATE_VOLUME)
        .arg("request_spec", &args.request_spec)?
        .arg("filter_properties", &args.filter_properties)?
        .arg("volume", args.volume)?
        .arg("backend", args.backend)?
        .arg("force_copy", &args.force_copy)?
        .build())
}

fn migrate_volume_to_host_v3_0(
    args: &MigrateVolume<'_>,
    _: RpcVersion,
) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::MIGRATE_VOLUME_TO_HOST)
        .arg("request_spec", &args.request_spec)?
        .arg("filter_properties", &args.filter_properties)?
        .arg("volume", args.volume)?
        .arg("host", args.backend)?
        .arg("force_host_copy", &args.force_copy)?
        .build())
}

/// `migrate_volume` at 3.3, falling back to `migrate_volume_to_host` at 3.0.
pub fn migrate_volume<'a>() -> OperationPolicy<MigrateVolume<'a>> {
    OperationPolicy::cast(
        method::MIGRATE_VOLUME,
        SchemaVariant::new(V3_3, method::MIGRATE_VOLUME, migrate_volume_v3_3),
    )
    .falls_back_to(SchemaVariant::new(
        V3_0,
        method::MIGRATE_VOLUME_TO_HOST,
        migrate_volume_to_host_v3_0,
    ))
}

// ---------------------------------------------------------------------------
// retype / manage_existing
// ---------------------------------------------------------------------------

/// Arguments shared by operations that only place an existing volume.
pub struct PlaceVolume<'a> {
    pub volume: &'a Volume,
    pub request_spec: Option<&'a RequestSpec>,
    pub filter_properties: Option<&'a FilterProperties>,
}

fn place_volume_args(
    method: &'static str,
    args: &PlaceVolume<'_>,
) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method)
        .arg("request_spec", &args.request_spec)?
        .arg("filter_properties", &args.filter_properties)?
        .arg("volume", args.volume)?
        .build())
}

fn retype_v3_0(args: &PlaceVolume<'_>, _: RpcVersion) -> Result<ArgumentMap, RpcError> {
    place_volume_args(method::RETYPE, args)
}

fn manage_existing_v3_0(args: &PlaceVolume<'_>, _: RpcVersion) -> Result<ArgumentMap, RpcError> {
    place_volume_args(method::MANAGE_EXISTING, args)
}

/// Baseline cast over [`PlaceVolume`].
pub fn retype<'a>() -> OperationPolicy<PlaceVolume<'a>> {
    OperationPolicy::cast(
        method::RETYPE,
        SchemaVariant::new(V3_0, method::RETYPE, retype_v3_0),
    )
}

/// Baseline cast over [`PlaceVolume`].
pub fn manage_existing<'a>() -> OperationPolicy<PlaceVolume<'a>> {
    OperationPolicy::cast(
        method::MANAGE_EXISTING,
        SchemaVariant::new(V3_0, method::MANAGE_EXISTING, manage_existing_v3_0),
    )
}

// ---------------------------------------------------------------------------
// extend_volume (hard gate at 3.2)
// ---------------------------------------------------------------------------

/// Arguments of [`extend_volume`].
pub struct ExtendVolume<'a> {
    pub volume: &'a Volume,
    /// New size in GiB.
    pub new_size: u64,
    /// Quota reservations to commit or roll back.
    pub reservations: &'a Reservations,
    pub request_spec: &'a RequestSpec,
    pub filter_properties: Option<&'a FilterProperties>,
}

fn extend_volume_v3_2(args: &ExtendVolume<'_>, _: RpcVersion) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::EXTEND_VOLUME)
        .arg("volume", args.volume)?
        .arg("new_size", &args.new_size)?
        .arg("reservations", args.reservations)?
        .arg("request_spec", args.request_spec)?
        .arg("filter_properties", &args.filter_properties)?
        .build())
}

/// Cast that requires 3.2; older fleets fail with `ServiceTooOld`.
pub fn extend_volume<'a>() -> OperationPolicy<ExtendVolume<'a>> {
    OperationPolicy::cast(
        method::EXTEND_VOLUME,
        SchemaVariant::new(V3_2, method::EXTEND_VOLUME, extend_volume_v3_2),
    )
    .hard_gated()
}

// ---------------------------------------------------------------------------
// get_pools (call)
// ---------------------------------------------------------------------------

/// Arguments of [`get_pools`].
pub struct GetPools<'a> {
    /// Restricts the listing; `None` lists every pool.
    pub filters: Option<&'a FilterProperties>,
}

fn get_pools_v3_0(args: &GetPools<'_>, _: RpcVersion) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::GET_POOLS)
        .arg("filters", &args.filters)?
        .build())
}

/// Blocking call whose reply is the pool list.
pub fn get_pools<'a>() -> OperationPolicy<GetPools<'a>> {
    OperationPolicy::call(
        method::GET_POOLS,
        SchemaVariant::new(V3_0, method::GET_POOLS, get_pools_v3_0),
    )
}

// ---------------------------------------------------------------------------
// update_service_capabilities (fanout, soft fallback drops cluster/timestamp)
// ---------------------------------------------------------------------------

/// Arguments of [`update_service_capabilities`].
pub struct UpdateServiceCapabilities<'a> {
    pub service_name: &'a ServiceName,
    pub host: &'a HostName,
    pub capabilities: &'a Capabilities,
    pub cluster_name: Option<&'a ClusterName>,
    /// Report time; resolved by the façade before shaping.
    pub timestamp: Timestamp,
}

fn update_service_capabilities_v3_3(
    args: &UpdateServiceCapabilities<'_>,
    _: RpcVersion,
) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::UPDATE_SERVICE_CAPABILITIES)
        .arg("service_name", args.service_name)?
        .arg("host", args.host)?
        .arg("capabilities", args.capabilities)?
        .arg("cluster_name", &args.cluster_name)?
        .arg("timestamp", &args.timestamp)?
        .build())
}

fn update_service_capabilities_v3_0(
    args: &UpdateServiceCapabilities<'_>,
    _: RpcVersion,
) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::UPDATE_SERVICE_CAPABILITIES)
        .arg("service_name", args.service_name)?
        .arg("host", args.host)?
        .arg("capabilities", args.capabilities)?
        .build())
}

/// Fanout cast; `cluster_name` and `timestamp` are only sent from 3.3.
pub fn update_service_capabilities<'a>() -> OperationPolicy<UpdateServiceCapabilities<'a>> {
    OperationPolicy::fanout_cast(
        method::UPDATE_SERVICE_CAPABILITIES,
        SchemaVariant::new(
            V3_3,
            method::UPDATE_SERVICE_CAPABILITIES,
            update_service_capabilities_v3_3,
        ),
    )
    .falls_back_to(SchemaVariant::new(
        V3_0,
        method::UPDATE_SERVICE_CAPABILITIES,
        update_service_capabilities_v3_0,
    ))
}

// ---------------------------------------------------------------------------
// notify_service_capabilities (hard gate at 3.1)
// ---------------------------------------------------------------------------

/// Arguments of [`notify_service_capabilities`].
pub struct NotifyServiceCapabilities<'a> {
    pub service_name: &'a ServiceName,
    pub host: &'a HostName,
    pub capabilities: &'a Capabilities,
}

fn notify_service_capabilities_v3_1(
    args: &NotifyServiceCapabilities<'_>,
    _: RpcVersion,
) -> Result<ArgumentMap, RpcError> {
    Ok(ArgsBuilder::for_method(method::NOTIFY_SERVICE_CAPABILITIES)
        .arg("service_name", args.service_name)?
        .arg("host", args.host)?
        .arg("capabilities", args.capabilities)?
        .build())
}

/// Cast that requires 3.1; older fleets fail with `ServiceTooOld`.
pub fn notify_service_capabilities<'a>() -> OperationPolicy<NotifyServiceCapabilities<'a>> {
    OperationPolicy::cast(
        method::NOTIFY_SERVICE_CAPABILITIES,
        SchemaVariant::new(
            V3_1,
            method::NOTIFY_SERVICE_CAPABILITIES,
            notify_service_capabilities_v3_1,
        ),
    )
    .hard_gated()
}
