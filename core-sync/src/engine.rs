//! # Merged Sync Engine
//!
//! Synchronizes every constituent of a merged entry and manages the references
//! that make up a merge.
//!
//! ## Overview
//!
//! [`MergeSyncEngine::synchronize_all`] is the heart of the crate:
//!
//! 1. Load the merge's references; a merge with nothing but the
//!    self-placeholder is corrupted and fails before any fetch
//! 2. Group the updating references by source, one task per group
//! 3. Each group waits for a permit of a shared [`ConcurrencyLimiter`]
//!    (5 by default) and processes its references one after another:
//!    load the constituent entry, fetch details if it was never initialized,
//!    fetch the episode listing, reconcile it, enqueue new downloads
//! 4. A failing constituent is logged, reported as an event and remembered;
//!    its siblings keep going
//! 5. After every group finished, the union of synced episodes is returned, or
//!    [`SyncError::PartialFailure`] carrying that union and the last failure
//!
//! Cancellation through the [`CancellationToken`] is not a failure to
//! remember: it aborts every group, including those still queued for a
//! permit, and returns [`SyncError::Cancelled`] at once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{MergeSyncConfig, MergeSyncEngine};
//! use core_async::sync::CancellationToken;
//!
//! let engine = MergeSyncEngine::new(
//!     MergeSyncConfig::from(&core_config),
//!     references,
//!     entries,
//!     core_config.source_resolver.clone(),
//!     reconciler,
//!     Arc::new(UnreadDownloadFilter),
//!     download_queue,
//! )
//! .with_event_bus(event_bus.clone());
//!
//! let token = CancellationToken::new();
//! match engine.synchronize_all(&merged_entry, &token).await {
//!     Ok(episodes) => println!("{} episodes synced", episodes.len()),
//!     Err(err) => {
//!         let survivors = err.synced_episodes();
//!         eprintln!("sync failed after {} episodes: {}", survivors.len(), err);
//!     }
//! }
//! ```

use crate::collaborators::{DownloadEnqueuer, DownloadFilter, EpisodeReconciler};
use crate::cycle::SyncCycleId;
use crate::error::{Result, SyncError};
use bridge_traits::source::{EntryDetails, Source};
use bridge_traits::{SourceId, SourceResolver};
use core_async::limiter::ConcurrencyLimiter;
use core_async::sync::CancellationToken;
use core_async::task::{run_until_cancelled, JoinSet};
use core_async::time::{timeout, Duration, Instant};
use core_library::{
    resolve_info_reference, ConstituentEntry, EntryId, EntryRepository, Episode, LibraryError,
    MergeReference, MergeReferenceStore, MergedEntry, ReferenceId, MERGED_SOURCE_ID,
};
use core_runtime::config::{CoreConfig, DEFAULT_MAX_CONCURRENT_SOURCES};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SyncEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSyncConfig {
    /// Source groups fetched at the same time
    pub max_concurrent_sources: usize,

    /// Timeout for fetching one constituent's details and listing
    pub fetch_timeout: Option<Duration>,

    /// Global switch for download enqueueing
    pub download_new_episodes: bool,
}

impl Default for MergeSyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            fetch_timeout: None,
            download_new_episodes: true,
        }
    }
}

impl From<&CoreConfig> for MergeSyncConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            max_concurrent_sources: config.max_concurrent_sources,
            fetch_timeout: config.fetch_timeout,
            download_new_episodes: config.download_new_episodes,
        }
    }
}

/// References sharing one source, processed by a single task.
#[derive(Debug, Clone)]
struct SourceGroup {
    source_id: SourceId,
    references: Vec<MergeReference>,
}

/// Groups updating, non-placeholder references by source in first-seen order.
fn group_by_source(references: &[MergeReference]) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    let mut index: HashMap<SourceId, usize> = HashMap::new();

    for reference in references
        .iter()
        .filter(|reference| !reference.is_self_placeholder() && reference.receives_updates)
    {
        let source_id = reference.constituent_source_id;
        match index.get(&source_id) {
            Some(&position) => groups[position].references.push(reference.clone()),
            None => {
                index.insert(source_id, groups.len());
                groups.push(SourceGroup {
                    source_id,
                    references: vec![reference.clone()],
                });
            }
        }
    }
    groups
}

struct ConstituentFailure {
    reference: MergeReference,
    error: SyncError,
}

#[derive(Default)]
struct GroupOutcome {
    episodes: Vec<Episode>,
    downloads_enqueued: u64,
    failures: Vec<ConstituentFailure>,
}

struct ReferenceOutcome {
    episodes: Vec<Episode>,
    downloads_enqueued: u64,
}

/// State shared between the engine and its group tasks.
#[derive(Clone)]
struct EngineInner {
    config: MergeSyncConfig,
    references: Arc<dyn MergeReferenceStore>,
    entries: Arc<dyn EntryRepository>,
    sources: Arc<dyn SourceResolver>,
    reconciler: Arc<dyn EpisodeReconciler>,
    download_filter: Arc<dyn DownloadFilter>,
    download_enqueuer: Arc<dyn DownloadEnqueuer>,
    event_bus: Option<EventBus>,
}

/// Synchronizes merged entries and edits their references.
pub struct MergeSyncEngine {
    inner: Arc<EngineInner>,
}

impl MergeSyncEngine {
    pub fn new(
        config: MergeSyncConfig,
        references: Arc<dyn MergeReferenceStore>,
        entries: Arc<dyn EntryRepository>,
        sources: Arc<dyn SourceResolver>,
        reconciler: Arc<dyn EpisodeReconciler>,
        download_filter: Arc<dyn DownloadFilter>,
        download_enqueuer: Arc<dyn DownloadEnqueuer>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                references,
                entries,
                sources,
                reconciler,
                download_filter,
                download_enqueuer,
                event_bus: None,
            }),
        }
    }

    /// Publish sync and library events on `event_bus`.
    ///
    /// Call before sharing the engine; group tasks spawned earlier keep the
    /// previous (absent) bus.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        Arc::make_mut(&mut self.inner).event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &MergeSyncConfig {
        &self.inner.config
    }

    /// Sync every updating constituent of `merged_entry`.
    ///
    /// # Returns
    ///
    /// The union of all reconciled episodes in no particular constituent order.
    ///
    /// # Errors
    ///
    /// - `CorruptedMerge` if the merge has no constituent references; nothing
    ///   is fetched
    /// - `Cancelled` as soon as `token` fires
    /// - `PartialFailure` if any constituent failed; it carries the episodes of
    ///   the constituents that succeeded and the last captured failure
    #[instrument(
        skip(self, merged_entry, token),
        fields(merged_entry_id = %merged_entry.id, cycle_id = tracing::field::Empty)
    )]
    pub async fn synchronize_all(
        &self,
        merged_entry: &MergedEntry,
        token: &CancellationToken,
    ) -> Result<Vec<Episode>> {
        let cycle_id = SyncCycleId::new();
        tracing::Span::current().record("cycle_id", tracing::field::display(&cycle_id));
        let started_at = Instant::now();
        let inner = &self.inner;

        if token.is_cancelled() {
            inner.emit_sync(SyncEvent::Cancelled {
                cycle_id: cycle_id.as_str(),
                merged_entry_id: merged_entry.id.0,
            });
            return Err(SyncError::Cancelled);
        }

        let references = inner.references.get_references(merged_entry.id).await?;
        if !references.iter().any(|r| !r.is_self_placeholder()) {
            warn!("Merged entry has no constituent references");
            return Err(SyncError::CorruptedMerge {
                merged_entry_id: merged_entry.id,
            });
        }

        let groups = group_by_source(&references);
        info!(source_groups = groups.len(), "Merged sync started");
        inner.emit_sync(SyncEvent::Started {
            cycle_id: cycle_id.as_str(),
            merged_entry_id: merged_entry.id.0,
            source_groups: saturating_u32(groups.len()),
        });

        let limiter = ConcurrencyLimiter::new(inner.config.max_concurrent_sources);
        let mut tasks = JoinSet::new();
        for group in groups {
            let inner = Arc::clone(&self.inner);
            let limiter = limiter.clone();
            let token = token.clone();
            tasks.spawn(async move {
                let _permit = limiter
                    .acquire(&token)
                    .await
                    .map_err(|_| SyncError::Cancelled)?;
                inner.sync_group(group, &token).await
            });
        }

        let mut synced = Vec::new();
        let mut downloads_enqueued = 0u64;
        let mut last_error: Option<SyncError> = None;

        loop {
            let joined = match run_until_cancelled(token, tasks.join_next()).await {
                Some(Some(joined)) => joined,
                Some(None) => break,
                None => return Err(self.cancelled(&cycle_id, merged_entry.id)),
            };

            match joined {
                Ok(Ok(outcome)) => {
                    for failure in outcome.failures {
                        warn!(
                            constituent_entry_id = %failure.reference.constituent_entry_id,
                            source_id = %failure.reference.constituent_source_id,
                            error = %failure.error,
                            "Constituent sync failed"
                        );
                        inner.emit_sync(SyncEvent::ConstituentFailed {
                            cycle_id: cycle_id.as_str(),
                            merged_entry_id: merged_entry.id.0,
                            constituent_entry_id: failure.reference.constituent_entry_id.0,
                            source_id: failure.reference.constituent_source_id.0,
                            message: failure.error.to_string(),
                        });
                        last_error = Some(failure.error);
                    }
                    downloads_enqueued += outcome.downloads_enqueued;
                    synced.extend(outcome.episodes);
                }
                Ok(Err(SyncError::Cancelled)) => {
                    return Err(self.cancelled(&cycle_id, merged_entry.id));
                }
                Ok(Err(error)) => last_error = Some(error),
                Err(join_error) => {
                    warn!(error = %join_error, "Source group task failed");
                    last_error = Some(SyncError::TaskFailed(join_error.to_string()));
                }
            }
        }

        let duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        match last_error {
            None => {
                info!(
                    episodes = synced.len(),
                    downloads_enqueued, duration_ms, "Merged sync completed"
                );
                inner.emit_sync(SyncEvent::Completed {
                    cycle_id: cycle_id.as_str(),
                    merged_entry_id: merged_entry.id.0,
                    episodes_synced: saturating_u64(synced.len()),
                    downloads_enqueued,
                    duration_ms,
                });
                Ok(synced)
            }
            Some(error) => {
                warn!(
                    episodes = synced.len(),
                    error = %error,
                    duration_ms,
                    "Merged sync finished with failures"
                );
                inner.emit_sync(SyncEvent::Failed {
                    cycle_id: cycle_id.as_str(),
                    merged_entry_id: merged_entry.id.0,
                    message: error.to_string(),
                    episodes_synced: saturating_u64(synced.len()),
                });
                Err(SyncError::PartialFailure {
                    episodes: synced,
                    last_error: Box::new(error),
                })
            }
        }
    }

    fn cancelled(&self, cycle_id: &SyncCycleId, merged_entry_id: EntryId) -> SyncError {
        info!("Merged sync cancelled");
        self.inner.emit_sync(SyncEvent::Cancelled {
            cycle_id: cycle_id.as_str(),
            merged_entry_id: merged_entry_id.0,
        });
        SyncError::Cancelled
    }

    /// Fetch fresh details for the merge's info constituent and store them on
    /// that constituent.
    ///
    /// # Errors
    ///
    /// `CorruptedMerge` if no info reference exists; otherwise the same
    /// failures a constituent fetch can produce.
    #[instrument(skip(self, merged_entry), fields(merged_entry_id = %merged_entry.id))]
    pub async fn fetch_info_details(&self, merged_entry: &MergedEntry) -> Result<EntryDetails> {
        let inner = &self.inner;
        let reference = inner
            .references
            .get_info_reference(merged_entry.id)
            .await?
            .ok_or(SyncError::CorruptedMerge {
                merged_entry_id: merged_entry.id,
            })?;

        let source = inner.resolve_source(reference.constituent_source_id)?;
        let mut entry = inner.load_constituent(&reference).await?;

        let details = inner
            .with_fetch_timeout(entry.id, async {
                source
                    .fetch_details(&entry.source_entry())
                    .await
                    .map_err(|e| constituent_error(&reference, e))
            })
            .await?;

        entry.apply_details(&details);
        inner.entries.update(&entry).await?;
        debug!(constituent_entry_id = %entry.id, "Refreshed info constituent");

        inner.emit_library(LibraryEvent::InfoDetailsRefreshed {
            merged_entry_id: merged_entry.id.0,
            constituent_entry_id: entry.id.0,
        });
        Ok(details)
    }

    /// Add `constituents` to `merged_entry`.
    ///
    /// Creates the self-placeholder when missing. Constituents already part of
    /// the merge are skipped. When the merge has no info reference yet, the
    /// first new constituent becomes it.
    ///
    /// # Returns
    ///
    /// Ids of the references created for the given constituents.
    #[instrument(skip(self, merged_entry, constituents), fields(merged_entry_id = %merged_entry.id))]
    pub async fn merge(
        &self,
        merged_entry: &MergedEntry,
        constituents: &[ConstituentEntry],
    ) -> Result<Vec<ReferenceId>> {
        let inner = &self.inner;

        if let Some(invalid) = constituents
            .iter()
            .find(|c| c.source_id == MERGED_SOURCE_ID || c.id == merged_entry.id)
        {
            return Err(LibraryError::invalid(
                "constituents",
                format!("entry {} cannot be merged into itself", invalid.id),
            )
            .into());
        }

        let existing = inner.references.get_references(merged_entry.id).await?;
        if constituents.is_empty() && !existing.iter().any(|r| !r.is_self_placeholder()) {
            return Err(LibraryError::invalid(
                "constituents",
                "a merge needs at least one constituent",
            )
            .into());
        }

        if !existing.iter().any(MergeReference::is_self_placeholder) {
            inner
                .references
                .insert_reference(MergeReference::self_placeholder(merged_entry.id))
                .await?;
        }

        let mut needs_info = !resolve_info_reference(&existing)
            .map(|reference| reference.is_info_source)
            .unwrap_or(false);
        let mut next_priority = existing
            .iter()
            .filter(|r| !r.is_self_placeholder())
            .map(|r| r.priority + 1)
            .max()
            .unwrap_or(0);

        let mut created = Vec::new();
        for constituent in constituents {
            let already_merged = existing.iter().any(|r| {
                r.constituent_entry_id == constituent.id
                    && r.constituent_source_id == constituent.source_id
            });
            if already_merged {
                debug!(constituent_entry_id = %constituent.id, "Constituent already merged");
                continue;
            }

            let mut reference = MergeReference::for_constituent(merged_entry.id, constituent);
            reference.priority = next_priority;
            reference.is_info_source = needs_info;
            next_priority += 1;
            needs_info = false;

            let id = inner.references.insert_reference(reference).await?;
            inner.emit_library(LibraryEvent::ReferenceMerged {
                merged_entry_id: merged_entry.id.0,
                constituent_entry_id: constituent.id.0,
            });
            created.push(id);
        }

        info!(created = created.len(), "Merged constituents");
        Ok(created)
    }

    /// Remove one constituent reference from its merge.
    ///
    /// # Errors
    ///
    /// - `LastReference` if it is the merge's only constituent
    /// - `Library(InvalidInput)` for the self-placeholder
    /// - `Library(NotFound)` for an unknown id
    #[instrument(skip(self))]
    pub async fn unmerge(&self, reference_id: ReferenceId) -> Result<()> {
        let inner = &self.inner;
        let reference = inner
            .references
            .find_reference(reference_id)
            .await?
            .ok_or_else(|| LibraryError::not_found("MergeReference", reference_id))?;

        if reference.is_self_placeholder() {
            return Err(LibraryError::invalid(
                "reference_id",
                "the self placeholder cannot be unmerged",
            )
            .into());
        }

        let constituents = inner
            .references
            .get_references(reference.merged_entry_id)
            .await?
            .into_iter()
            .filter(|r| !r.is_self_placeholder())
            .count();
        if constituents <= 1 {
            return Err(SyncError::LastReference(reference_id));
        }

        inner.references.delete_reference(reference_id).await?;
        info!(
            merged_entry_id = %reference.merged_entry_id,
            constituent_entry_id = %reference.constituent_entry_id,
            "Removed constituent from merge"
        );
        inner.emit_library(LibraryEvent::ReferenceUnmerged {
            merged_entry_id: reference.merged_entry_id.0,
            constituent_entry_id: reference.constituent_entry_id.0,
            remaining_references: saturating_u32(constituents - 1),
        });
        Ok(())
    }

    /// Store edited settings for references of one merge.
    ///
    /// Flagging a reference as the info source demotes the merge's previous
    /// info reference in the same store update.
    ///
    /// # Errors
    ///
    /// `Library(InvalidInput)` if a reference belongs to another merge or more
    /// than one reference is flagged as the info source.
    #[instrument(skip(self, references), fields(count = references.len()))]
    pub async fn update_settings(
        &self,
        merged_entry_id: EntryId,
        references: &[MergeReference],
    ) -> Result<usize> {
        if references
            .iter()
            .any(|reference| reference.merged_entry_id != merged_entry_id)
        {
            return Err(LibraryError::invalid(
                "references",
                format!("all references must belong to merge {}", merged_entry_id),
            )
            .into());
        }
        if references.iter().filter(|r| r.is_info_source).count() > 1 {
            return Err(LibraryError::invalid(
                "is_info_source",
                "only one reference can supply metadata",
            )
            .into());
        }

        let updated = self.inner.references.update_settings(references).await?;
        self.inner.emit_library(LibraryEvent::SettingsUpdated {
            merged_entry_id: merged_entry_id.0,
            references_updated: saturating_u32(updated),
        });
        Ok(updated)
    }
}

fn saturating_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn saturating_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

fn constituent_error(reference: &MergeReference, source: bridge_traits::BridgeError) -> SyncError {
    SyncError::ConstituentFetch {
        constituent_entry_id: reference.constituent_entry_id,
        source_id: reference.constituent_source_id,
        source,
    }
}

impl EngineInner {
    fn emit_sync(&self, event: SyncEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Sync(event)).ok();
        }
    }

    fn emit_library(&self, event: LibraryEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Library(event)).ok();
        }
    }

    fn resolve_source(&self, source_id: SourceId) -> Result<Arc<dyn Source>> {
        self.sources
            .resolve(source_id)
            .ok_or(SyncError::SourceNotFound(source_id))
    }

    async fn load_constituent(&self, reference: &MergeReference) -> Result<ConstituentEntry> {
        self.entries
            .find_by_id(reference.constituent_entry_id)
            .await?
            .ok_or_else(|| {
                LibraryError::not_found("ConstituentEntry", reference.constituent_entry_id).into()
            })
    }

    async fn with_fetch_timeout<T, F>(&self, entry_id: EntryId, future: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        match self.config.fetch_timeout {
            Some(limit) => timeout(limit, future).await.map_err(|_| SyncError::Timeout {
                constituent_entry_id: entry_id,
                secs: limit.as_secs(),
            })?,
            None => future.await,
        }
    }

    /// Process the references of one source in order. Only cancellation ends
    /// the group early; every other failure is recorded and the next reference
    /// runs.
    async fn sync_group(&self, group: SourceGroup, token: &CancellationToken) -> Result<GroupOutcome> {
        debug!(
            source_id = %group.source_id,
            references = group.references.len(),
            "Syncing source group"
        );
        let mut outcome = GroupOutcome::default();

        for reference in group.references {
            match run_until_cancelled(token, self.sync_reference(&reference)).await {
                None => return Err(SyncError::Cancelled),
                Some(Ok(synced)) => {
                    outcome.episodes.extend(synced.episodes);
                    outcome.downloads_enqueued += synced.downloads_enqueued;
                }
                Some(Err(error)) if error.is_cancelled() => return Err(error),
                Some(Err(error)) => outcome.failures.push(ConstituentFailure { reference, error }),
            }
        }
        Ok(outcome)
    }

    async fn sync_reference(&self, reference: &MergeReference) -> Result<ReferenceOutcome> {
        let source = self.resolve_source(reference.constituent_source_id)?;
        let mut entry = self.load_constituent(reference).await?;

        let remote = self
            .with_fetch_timeout(entry.id, async {
                if !entry.initialized {
                    let details = source
                        .fetch_details(&entry.source_entry())
                        .await
                        .map_err(|e| constituent_error(reference, e))?;
                    entry.apply_details(&details);
                    self.entries.update(&entry).await?;
                }
                source
                    .fetch_episode_list(&entry.source_entry())
                    .await
                    .map_err(|e| constituent_error(reference, e))
            })
            .await?;

        let reconciled = self
            .reconciler
            .reconcile(remote, &entry, source.as_ref())
            .await?;

        let mut downloads_enqueued = 0;
        if self.config.download_new_episodes && reference.downloads_enabled {
            let new_episodes = reconciled.newly_added();
            if !new_episodes.is_empty() {
                let eligible = self
                    .download_filter
                    .select_downloadable(&entry, new_episodes)
                    .await;
                if !eligible.is_empty() {
                    downloads_enqueued = saturating_u64(eligible.len());
                    self.download_enqueuer.enqueue(&entry, eligible);
                }
            }
        }

        debug!(
            constituent_entry_id = %entry.id,
            episodes = reconciled.episodes.len(),
            new_episodes = reconciled.inserted.len(),
            downloads_enqueued,
            "Constituent synced"
        );
        Ok(ReferenceOutcome {
            episodes: reconciled.episodes,
            downloads_enqueued,
        })
    }
}
