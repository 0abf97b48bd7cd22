//! Merge reference store trait and in-memory implementation

use crate::error::{LibraryError, Result};
use crate::models::{resolve_info_reference, EntryId, MergeReference, ReferenceId};
use async_trait::async_trait;
use core_async::sync::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// Access to the references behind merged entries.
#[async_trait]
pub trait MergeReferenceStore: Send + Sync {
    /// All references of a merged entry, self-placeholder included, ordered by
    /// priority then id.
    async fn get_references(&self, merged_entry_id: EntryId) -> Result<Vec<MergeReference>>;

    /// The reference that supplies the merged entry's metadata.
    ///
    /// # Returns
    /// - `Ok(Some(reference))` for the flagged info reference, else the first
    ///   non-placeholder reference
    /// - `Ok(None)` if the merge has no constituent references
    async fn get_info_reference(&self, merged_entry_id: EntryId) -> Result<Option<MergeReference>> {
        let references = self.get_references(merged_entry_id).await?;
        Ok(resolve_info_reference(&references).cloned())
    }

    /// Find a single reference by id
    async fn find_reference(&self, id: ReferenceId) -> Result<Option<MergeReference>>;

    /// Insert a reference and return its assigned id. The `id` field of the
    /// argument is ignored.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the merge already references the same
    /// constituent entry.
    async fn insert_reference(&self, reference: MergeReference) -> Result<ReferenceId>;

    /// Copy the settings fields (info flag, update flag, download flag,
    /// priority) of each given reference onto the stored row with the same id.
    ///
    /// Flagging a reference as the info source clears the flag on every other
    /// reference of its merge, so a merge never has two info references.
    ///
    /// # Errors
    /// Returns `NotFound` if any id is unknown and `InvalidInput` if two given
    /// references of one merge are flagged; nothing is applied in either case.
    async fn update_settings(&self, references: &[MergeReference]) -> Result<usize>;

    /// Delete a reference by id
    ///
    /// # Returns
    /// - `Ok(true)` if the reference was deleted
    /// - `Ok(false)` if it did not exist
    async fn delete_reference(&self, id: ReferenceId) -> Result<bool>;
}

#[derive(Default)]
struct ReferenceTable {
    last_id: i64,
    rows: BTreeMap<ReferenceId, MergeReference>,
}

/// [`MergeReferenceStore`] kept in memory.
#[derive(Default)]
pub struct InMemoryMergeReferenceStore {
    table: RwLock<ReferenceTable>,
}

impl InMemoryMergeReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MergeReferenceStore for InMemoryMergeReferenceStore {
    async fn get_references(&self, merged_entry_id: EntryId) -> Result<Vec<MergeReference>> {
        let table = self.table.read().await;
        let mut references: Vec<MergeReference> = table
            .rows
            .values()
            .filter(|reference| reference.merged_entry_id == merged_entry_id)
            .cloned()
            .collect();
        references.sort_by_key(|reference| (reference.priority, reference.id));
        Ok(references)
    }

    async fn find_reference(&self, id: ReferenceId) -> Result<Option<MergeReference>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn insert_reference(&self, mut reference: MergeReference) -> Result<ReferenceId> {
        let mut table = self.table.write().await;

        let duplicate = table.rows.values().any(|existing| {
            existing.merged_entry_id == reference.merged_entry_id
                && existing.constituent_entry_id == reference.constituent_entry_id
                && existing.constituent_source_id == reference.constituent_source_id
        });
        if duplicate {
            return Err(LibraryError::invalid(
                "constituent_entry_id",
                format!(
                    "entry {} is already part of merge {}",
                    reference.constituent_entry_id, reference.merged_entry_id
                ),
            ));
        }

        table.last_id += 1;
        let id = ReferenceId(table.last_id);
        reference.id = id;

        debug!(
            reference_id = %id,
            merged_entry_id = %reference.merged_entry_id,
            source_id = %reference.constituent_source_id,
            "Inserted merge reference"
        );
        table.rows.insert(id, reference);
        Ok(id)
    }

    async fn update_settings(&self, references: &[MergeReference]) -> Result<usize> {
        let mut table = self.table.write().await;

        if let Some(missing) = references
            .iter()
            .find(|reference| !table.rows.contains_key(&reference.id))
        {
            return Err(LibraryError::not_found("MergeReference", missing.id));
        }

        let mut info_sources: BTreeMap<EntryId, ReferenceId> = BTreeMap::new();
        for reference in references.iter().filter(|r| r.is_info_source) {
            let Some(stored) = table.rows.get(&reference.id) else {
                continue;
            };
            if let Some(previous) = info_sources.insert(stored.merged_entry_id, reference.id) {
                if previous != reference.id {
                    return Err(LibraryError::invalid(
                        "is_info_source",
                        format!("merge {} has more than one info source", stored.merged_entry_id),
                    ));
                }
            }
        }

        for reference in references {
            if let Some(stored) = table.rows.get_mut(&reference.id) {
                stored.apply_settings(reference);
            }
        }

        for stored in table.rows.values_mut() {
            let demoted = info_sources
                .get(&stored.merged_entry_id)
                .is_some_and(|info_id| *info_id != stored.id && stored.is_info_source);
            if demoted {
                debug!(reference_id = %stored.id, "Cleared previous info source");
                stored.is_info_source = false;
            }
        }
        Ok(references.len())
    }

    async fn delete_reference(&self, id: ReferenceId) -> Result<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }
}
