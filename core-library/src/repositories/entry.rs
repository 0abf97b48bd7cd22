//! Constituent entry repository

use crate::error::{LibraryError, Result};
use crate::models::{ConstituentEntry, EntryId};
use async_trait::async_trait;
use core_async::sync::RwLock;
use std::collections::HashMap;

/// Read and write access to constituent library entries
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Find an entry by its ID
    ///
    /// # Returns
    /// - `Ok(Some(entry))` if found
    /// - `Ok(None)` if not found
    async fn find_by_id(&self, id: EntryId) -> Result<Option<ConstituentEntry>>;

    /// Find several entries at once; unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[EntryId]) -> Result<Vec<ConstituentEntry>>;

    /// Insert a new entry
    ///
    /// # Errors
    /// Returns `InvalidInput` if an entry with the same id exists.
    async fn insert(&self, entry: &ConstituentEntry) -> Result<()>;

    /// Update an existing entry
    ///
    /// # Errors
    /// Returns `NotFound` if the entry does not exist.
    async fn update(&self, entry: &ConstituentEntry) -> Result<()>;
}

/// [`EntryRepository`] kept in memory.
#[derive(Default)]
pub struct InMemoryEntryRepository {
    entries: RwLock<HashMap<EntryId, ConstituentEntry>>,
}

impl InMemoryEntryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with `entries`; later duplicates replace earlier ones.
    pub fn with_entries(entries: impl IntoIterator<Item = ConstituentEntry>) -> Self {
        let entries = entries.into_iter().map(|entry| (entry.id, entry)).collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl EntryRepository for InMemoryEntryRepository {
    async fn find_by_id(&self, id: EntryId) -> Result<Option<ConstituentEntry>> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[EntryId]) -> Result<Vec<ConstituentEntry>> {
        let entries = self.entries.read().await;
        Ok(ids.iter().filter_map(|id| entries.get(id).cloned()).collect())
    }

    async fn insert(&self, entry: &ConstituentEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&entry.id) {
            return Err(LibraryError::invalid(
                "id",
                format!("entry {} already exists", entry.id),
            ));
        }
        entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update(&self, entry: &ConstituentEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&entry.id) {
            Some(stored) => {
                *stored = entry.clone();
                Ok(())
            }
            None => Err(LibraryError::not_found("ConstituentEntry", entry.id)),
        }
    }
}
