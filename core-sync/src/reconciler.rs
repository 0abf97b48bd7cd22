//! # Natural-key reconciliation
//!
//! [`NaturalKeyReconciler`] upserts a remote listing into an
//! [`EpisodeRepository`] keyed by `(name, scanlator)` rather than by row id or
//! url, because sources renumber and re-slug their episodes.
//!
//! ## Rules
//!
//! - A remote row whose natural key matches a stored row updates that row in
//!   place: url, number, upload date and source order follow the remote side,
//!   while the id and the read and bookmark flags are preserved
//! - A remote row with an unseen key is inserted, stamped with the clock
//! - Duplicate keys inside one listing keep the first occurrence
//! - Stored rows missing from the listing are left alone (soft sync)
//! - An empty listing from a remote source is a failure, since it almost
//!   always means the site changed its markup

use crate::collaborators::{EpisodeReconciler, Reconciled};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::source::{RemoteEpisode, Source};
use bridge_traits::{BridgeError, Clock};
use core_library::models::normalize_scanlator;
use core_library::{ConstituentEntry, Episode, EpisodeRepository, NaturalKey, NewEpisode};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Reference [`EpisodeReconciler`] over an [`EpisodeRepository`].
pub struct NaturalKeyReconciler {
    episodes: Arc<dyn EpisodeRepository>,
    clock: Arc<dyn Clock>,
}

impl NaturalKeyReconciler {
    pub fn new(episodes: Arc<dyn EpisodeRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { episodes, clock }
    }
}

/// Copies remote-owned fields onto a stored row; returns whether anything changed.
fn apply_remote(stored: &mut Episode, remote: &RemoteEpisode, source_order: i64) -> bool {
    let before = stored.clone();

    stored.url = remote.url.clone();
    stored.number = remote.number;
    if remote.uploaded_at > 0 {
        stored.uploaded_at = remote.uploaded_at;
    }
    stored.source_order = source_order;

    *stored != before
}

#[async_trait]
impl EpisodeReconciler for NaturalKeyReconciler {
    async fn reconcile(
        &self,
        remote: Vec<RemoteEpisode>,
        entry: &ConstituentEntry,
        source: &dyn Source,
    ) -> Result<Reconciled> {
        if remote.is_empty() && !source.is_local() {
            return Err(SyncError::ConstituentFetch {
                constituent_entry_id: entry.id,
                source_id: entry.source_id,
                source: BridgeError::OperationFailed("No episodes found".to_string()),
            });
        }

        let stored = self.episodes.find_by_entry(entry.id).await?;
        let mut by_key: HashMap<NaturalKey, Episode> = HashMap::with_capacity(stored.len());
        for episode in stored {
            by_key.entry(episode.natural_key()).or_insert(episode);
        }

        let fetched_at = self.clock.unix_timestamp_millis();
        let mut seen = HashSet::with_capacity(remote.len());
        let mut kept = Vec::new();
        let mut to_update = Vec::new();
        let mut to_insert = Vec::new();

        for (position, remote_episode) in remote.iter().enumerate() {
            let source_order = position as i64;
            let key = NaturalKey::new(remote_episode.name.clone(), remote_episode.scanlator.clone());
            if !seen.insert(key.clone()) {
                continue;
            }

            match by_key.remove(&key) {
                Some(mut existing) => {
                    if apply_remote(&mut existing, remote_episode, source_order) {
                        to_update.push(existing.clone());
                    }
                    kept.push(existing);
                }
                None => to_insert.push(NewEpisode {
                    entry_id: entry.id,
                    url: remote_episode.url.clone(),
                    name: remote_episode.name.clone(),
                    number: remote_episode.number,
                    scanlator: normalize_scanlator(remote_episode.scanlator.clone()),
                    uploaded_at: remote_episode.uploaded_at,
                    fetched_at,
                    source_order,
                }),
            }
        }

        if !to_update.is_empty() {
            self.episodes.update(&to_update).await?;
        }
        let inserted = self.episodes.insert(to_insert).await?;

        debug!(
            entry_id = %entry.id,
            source = source.name(),
            inserted = inserted.len(),
            updated = to_update.len(),
            untouched = by_key.len(),
            "Reconciled episode listing"
        );

        let inserted_ids = inserted.iter().map(|episode| episode.id).collect();
        let mut episodes = kept;
        episodes.extend(inserted);
        episodes.sort_by_key(|episode| episode.source_order);

        Ok(Reconciled {
            episodes,
            inserted: inserted_ids,
        })
    }
}
