//! # Merged Sync Module
//!
//! Keeps a merged entry's episodes current across all of its constituent
//! sources.
//!
//! ## Overview
//!
//! A merged entry groups several source-specific entries (constituents) of the
//! same work. Syncing it means fetching every constituent's episode listing,
//! reconciling each listing into local storage and handing new episodes to the
//! download queue, with bounded parallelism and per-constituent failure
//! isolation.
//!
//! ## Components
//!
//! - **Sync Engine** (`engine`): Fans out over source groups, collects results,
//!   and edits the references that make up a merge
//! - **Collaborators** (`collaborators`): Reconciliation and download seams the
//!   host can replace
//! - **Reconciler** (`reconciler`): Natural-key upsert of remote listings
//! - **Sync Cycle** (`cycle`): Correlation id shared by a cycle's logs and events

pub mod collaborators;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod reconciler;

pub use collaborators::{
    DownloadEnqueuer, DownloadFilter, EpisodeReconciler, Reconciled, UnreadDownloadFilter,
};
pub use cycle::SyncCycleId;
pub use engine::{MergeSyncConfig, MergeSyncEngine};
pub use error::{Result, SyncError};
pub use reconciler::NaturalKeyReconciler;
