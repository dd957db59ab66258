//! Domain objects carried in scheduler messages.
//!
//! These are the shapes the scheduler receives; the façade normalises each of
//! them to primitives through [`rpc_core::to_primitive`] before sending.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use rpc_core::{ClusterName, HostName};

/// Free-form scheduler filter hints (e.g. `{"retry": {...}}`).
pub type FilterProperties = Map<String, Value>;

/// Capability report of one volume backend.
pub type Capabilities = Map<String, Value>;

/// Quota reservation identifiers committed or rolled back by the scheduler.
pub type Reservations = Vec<String>;

// ---------------------------------------------------------------------------

/// A block storage volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume identifier.
    pub id: Uuid,
    /// Size in GiB.
    pub size: u64,
    /// Lifecycle status (e.g. `"creating"`, `"available"`).
    pub status: String,
    /// Host currently serving the volume, if placed.
    pub host: Option<HostName>,
    /// Cluster the serving host belongs to, if clustered.
    pub cluster_name: Option<ClusterName>,
    /// Volume type, if typed.
    pub volume_type_id: Option<Uuid>,
    /// Availability zone requested or assigned.
    pub availability_zone: Option<String>,
}

impl Volume {
    /// Creates an unplaced volume in `creating` state.
    pub fn new(id: Uuid, size: u64) -> Self {
        Self {
            id,
            size,
            status: "creating".to_string(),
            host: None,
            cluster_name: None,
            volume_type_id: None,
            availability_zone: None,
        }
    }
}

/// A generic volume group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier.
    pub id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// Group type.
    pub group_type_id: Option<Uuid>,
    /// Volume types the group may contain.
    pub volume_type_ids: Vec<Uuid>,
    /// Availability zone.
    pub availability_zone: Option<String>,
}

/// A consistency group (the predecessor of [`Group`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyGroup {
    /// Consistency group identifier.
    pub id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// Comma-separated volume type list, as stored.
    pub volume_type: Option<String>,
    /// Availability zone.
    pub availability_zone: Option<String>,
}

/// Placement request handed to the scheduler's filters and weighers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    /// Volume being placed, if any.
    pub volume_id: Option<Uuid>,
    /// Source snapshot, if creating from one.
    pub snapshot_id: Option<Uuid>,
    /// Source image, if creating from one.
    pub image_id: Option<String>,
    /// Requested volume type.
    pub volume_type_id: Option<Uuid>,
    /// Requested availability zone.
    pub availability_zone: Option<String>,
    /// Any further properties understood by scheduler filters.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One storage pool as reported by `get_pools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Pool name, in `host@backend#pool` form.
    pub name: String,
    /// Last capabilities reported for the pool.
    #[serde(default)]
    pub capabilities: Capabilities,
}
