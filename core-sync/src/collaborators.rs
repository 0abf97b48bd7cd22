//! Collaborator traits injected into the [`MergeSyncEngine`](crate::MergeSyncEngine).
//!
//! The engine decides *what* to fetch and *when*; these traits decide how a
//! fetched listing lands in storage and which new episodes get downloaded.

use crate::error::Result;
use async_trait::async_trait;
use bridge_traits::source::{RemoteEpisode, Source};
use core_library::{ConstituentEntry, Episode, EpisodeId};
use std::collections::HashSet;

/// Outcome of reconciling one constituent's remote listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    /// Every episode present in the remote listing, in listing order, with
    /// stable row ids
    pub episodes: Vec<Episode>,
    /// Rows created by this reconciliation
    pub inserted: HashSet<EpisodeId>,
}

impl Reconciled {
    pub fn newly_added(&self) -> Vec<Episode> {
        self.episodes
            .iter()
            .filter(|episode| self.inserted.contains(&episode.id))
            .cloned()
            .collect()
    }
}

/// Upserts a remote listing into local episode storage.
///
/// Implementations must be idempotent: reconciling the same listing twice
/// yields the same episodes with the same ids and inserts nothing the second
/// time.
#[async_trait]
pub trait EpisodeReconciler: Send + Sync {
    async fn reconcile(
        &self,
        remote: Vec<RemoteEpisode>,
        entry: &ConstituentEntry,
        source: &dyn Source,
    ) -> Result<Reconciled>;
}

/// Picks which newly synced episodes should be downloaded.
#[async_trait]
pub trait DownloadFilter: Send + Sync {
    async fn select_downloadable(
        &self,
        entry: &ConstituentEntry,
        episodes: Vec<Episode>,
    ) -> Vec<Episode>;
}

/// Hands episodes to the host's download queue. Fire-and-forget.
pub trait DownloadEnqueuer: Send + Sync {
    fn enqueue(&self, entry: &ConstituentEntry, episodes: Vec<Episode>);
}

/// Downloads every unread new episode.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreadDownloadFilter;

#[async_trait]
impl DownloadFilter for UnreadDownloadFilter {
    async fn select_downloadable(
        &self,
        _entry: &ConstituentEntry,
        episodes: Vec<Episode>,
    ) -> Vec<Episode> {
        episodes.into_iter().filter(|episode| !episode.read).collect()
    }
}
