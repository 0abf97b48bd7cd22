//! Workspace facade crate.
//!
//! Hosts that want the whole merged-entry engine can depend on
//! `merge-engine-workspace` and toggle the `sync` / `episodes` features
//! instead of wiring each crate individually.

#[cfg(feature = "sync")]
pub use core_runtime as runtime;
#[cfg(feature = "sync")]
pub use core_sync as sync;

#[cfg(feature = "episodes")]
pub use core_episodes as episodes;
