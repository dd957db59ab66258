//! Versioned client for the volume scheduler RPC API.
//!
//! [`SchedulerApi`] is the only entry point callers need. Each method builds a
//! fresh envelope, choosing the newest message shape the scheduler fleet
//! accepts, and hands it to the injected [`rpc_core::Transport`].
//!
//! ## Architectural Layer
//!
//! **Façade.** The per-operation wire policy lives in [`operations`] as data;
//! selection and sending are done by [`rpc_core::VersionedDispatcher`]. This
//! crate performs no I/O of its own.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`api`] | `SchedulerApi` |
//! | [`operations`] | Per-operation argument structs, shapes and policies |
//! | [`objects`] | Domain objects carried in messages |
//! | [`versions`] | API version history and constants |

pub mod api;
pub mod objects;
pub mod operations;
pub mod versions;

pub use api::SchedulerApi;
pub use objects::{
    Capabilities, ConsistencyGroup, FilterProperties, Group, PoolInfo, Reservations, RequestSpec,
    Volume,
};
pub use versions::{BINARY, RPC_API_VERSION, RPC_DEFAULT_VERSION, TOPIC};
