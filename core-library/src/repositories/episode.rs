//! Episode repository

use crate::error::{LibraryError, Result};
use crate::models::{EntryId, Episode, EpisodeId, NewEpisode};
use async_trait::async_trait;
use core_async::sync::RwLock;
use std::collections::BTreeMap;

/// Episode rows of constituent entries
#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    /// Episodes of one entry ordered by source order
    async fn find_by_entry(&self, entry_id: EntryId) -> Result<Vec<Episode>>;

    /// Episodes of several entries, grouped in the order of `entry_ids`
    async fn find_by_entries(&self, entry_ids: &[EntryId]) -> Result<Vec<Episode>> {
        let mut episodes = Vec::new();
        for entry_id in entry_ids {
            episodes.extend(self.find_by_entry(*entry_id).await?);
        }
        Ok(episodes)
    }

    /// Insert new rows and return them with their assigned ids
    async fn insert(&self, episodes: Vec<NewEpisode>) -> Result<Vec<Episode>>;

    /// Overwrite existing rows
    ///
    /// # Errors
    /// Returns `NotFound` without applying anything if any row is missing.
    async fn update(&self, episodes: &[Episode]) -> Result<()>;
}

#[derive(Default)]
struct EpisodeTable {
    last_id: i64,
    rows: BTreeMap<EpisodeId, Episode>,
}

/// [`EpisodeRepository`] kept in memory.
#[derive(Default)]
pub struct InMemoryEpisodeRepository {
    table: RwLock<EpisodeTable>,
}

impl InMemoryEpisodeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored rows
    pub async fn count(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[async_trait]
impl EpisodeRepository for InMemoryEpisodeRepository {
    async fn find_by_entry(&self, entry_id: EntryId) -> Result<Vec<Episode>> {
        let table = self.table.read().await;
        let mut episodes: Vec<Episode> = table
            .rows
            .values()
            .filter(|episode| episode.entry_id == entry_id)
            .cloned()
            .collect();
        episodes.sort_by_key(|episode| (episode.source_order, episode.id));
        Ok(episodes)
    }

    async fn insert(&self, episodes: Vec<NewEpisode>) -> Result<Vec<Episode>> {
        let mut table = self.table.write().await;
        let mut inserted = Vec::with_capacity(episodes.len());

        for new_episode in episodes {
            table.last_id += 1;
            let episode = new_episode.into_episode(EpisodeId(table.last_id));
            table.rows.insert(episode.id, episode.clone());
            inserted.push(episode);
        }
        Ok(inserted)
    }

    async fn update(&self, episodes: &[Episode]) -> Result<()> {
        let mut table = self.table.write().await;

        if let Some(missing) = episodes
            .iter()
            .find(|episode| !table.rows.contains_key(&episode.id))
        {
            return Err(LibraryError::not_found("Episode", missing.id));
        }

        for episode in episodes {
            table.rows.insert(episode.id, episode.clone());
        }
        Ok(())
    }
}
