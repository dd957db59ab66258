//! Scheduler RPC API version history.
//!
//! | Version | Change |
//! |---------|--------|
//! | 3.0 | Removes 2.x compatibility. Baseline for every operation below. |
//! | 3.1 | Adds `notify_service_capabilities`. |
//! | 3.2 | Adds `extend_volume`. |
//! | 3.3 | Adds cluster support to `migrate_volume` (replacing `migrate_volume_to_host`) and to `update_service_capabilities`, which also starts carrying the capability timestamp. |
//!
//! Any change to an existing 3.x method must keep working when the remote
//! side is capped at 3.0: add a new variant to the operation's policy and keep
//! the older one as its fallback.

use rpc_core::RpcVersion;

pub const V3_0: RpcVersion = RpcVersion::new(3, 0);
pub const V3_1: RpcVersion = RpcVersion::new(3, 1);
pub const V3_2: RpcVersion = RpcVersion::new(3, 2);
pub const V3_3: RpcVersion = RpcVersion::new(3, 3);

/// Newest message shape this client can build.
pub const RPC_API_VERSION: RpcVersion = V3_3;

/// Version stamped on operations whose shape has not changed since 3.0.
pub const RPC_DEFAULT_VERSION: RpcVersion = V3_0;

/// Topic the scheduler service listens on.
pub const TOPIC: &str = "cinder-scheduler";

/// Binary name of the scheduler service.
pub const BINARY: &str = "cinder-scheduler";
