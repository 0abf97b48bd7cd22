//! # Episode List Projection
//!
//! Turns stored episode rows into [`EpisodeListItem`]s.
//!
//! For each episode the projector resolves:
//! - the owning constituent, falling back to the merged entry itself when the
//!   constituent is unknown
//! - the download state: a live queue record (queued, downloading, failed) wins
//!   over storage; otherwise local-storage constituents always count as
//!   downloaded and remote ones are looked up by [`DownloadKey`]
//! - a source label, only when the merge spans more than two sources
//!   including the merged entry's own placeholder source
//!
//! Lookup misses never fail; they resolve to "not downloaded" and unlabeled.

use crate::download_status::{DownloadKey, DownloadStatusIndex};
use crate::item::{DownloadState, EpisodeListItem};
use crate::selection::SelectionController;
use bridge_traits::{SourceId, SourceResolver};
use core_library::{ConstituentEntry, EntryId, Episode, MergeReference, MergedEntry, MERGED_SOURCE_ID};
use std::collections::{HashMap, HashSet};

/// Everything the episode list is derived from.
#[derive(Clone, Copy)]
pub struct ProjectionContext<'a> {
    pub merged_entry: &'a MergedEntry,
    pub episodes: &'a [Episode],
    pub references: &'a [MergeReference],
    pub constituents: &'a HashMap<EntryId, ConstituentEntry>,
    pub sources: &'a dyn SourceResolver,
    pub downloads: &'a dyn DownloadStatusIndex,
}

/// Per-constituent values shared by all of its episodes.
struct Owner<'a> {
    title: &'a str,
    source_id: SourceId,
    local: bool,
    label: Option<String>,
}

pub struct EpisodeListProjector<'a> {
    context: ProjectionContext<'a>,
    owners: HashMap<EntryId, Owner<'a>>,
    fallback: Owner<'a>,
}

impl<'a> EpisodeListProjector<'a> {
    pub fn new(context: ProjectionContext<'a>) -> Self {
        let labeled = spans_many_sources(&context);
        let owner = |title: &'a str, source_id: SourceId| Owner {
            title,
            source_id,
            local: context.sources.is_local(source_id),
            label: labeled.then(|| context.sources.display_name(source_id)),
        };

        let owners = context
            .constituents
            .iter()
            .map(|(id, entry)| (*id, owner(entry.title.as_str(), entry.source_id)))
            .collect();
        let fallback = owner(context.merged_entry.title.as_str(), MERGED_SOURCE_ID);

        Self {
            context,
            owners,
            fallback,
        }
    }

    pub fn project(&self, selection: &SelectionController) -> Vec<EpisodeListItem> {
        self.context
            .episodes
            .iter()
            .map(|episode| self.project_one(episode, selection))
            .collect()
    }

    fn project_one(&self, episode: &Episode, selection: &SelectionController) -> EpisodeListItem {
        let owner = self.owners.get(&episode.entry_id).unwrap_or(&self.fallback);

        let (download_state, download_progress) =
            match self.context.downloads.active_download(episode.id) {
                Some(active) => (active.state, active.progress),
                None if owner.local => (DownloadState::Downloaded, 100),
                None => {
                    let key = DownloadKey::new(episode, owner.title, owner.source_id);
                    if self.context.downloads.is_downloaded(&key) {
                        (DownloadState::Downloaded, 100)
                    } else {
                        (DownloadState::NotDownloaded, 0)
                    }
                }
            };

        EpisodeListItem {
            episode: episode.clone(),
            download_state,
            download_progress,
            selected: selection.is_selected(episode.id),
            source_label: owner.label.clone(),
            local: owner.local,
        }
    }
}

fn spans_many_sources(context: &ProjectionContext<'_>) -> bool {
    let mut sources: HashSet<SourceId> = context
        .references
        .iter()
        .map(|reference| reference.constituent_source_id)
        .collect();
    sources.extend(context.constituents.values().map(|entry| entry.source_id));
    sources.insert(MERGED_SOURCE_ID);
    sources.len() > 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download_status::DownloadStatusSnapshot;
    use crate::item::fixtures::episode;
    use async_trait::async_trait;
    use bridge_traits::source::{EntryDetails, RemoteEpisode, RemotePage, Source, SourceEntry};
    use bridge_traits::SourceRegistry;
    use core_library::EpisodeId;
    use std::sync::Arc;

    struct NamedSource {
        id: i64,
        name: &'static str,
        local: bool,
    }

    #[async_trait]
    impl Source for NamedSource {
        fn id(&self) -> SourceId {
            SourceId(self.id)
        }

        fn name(&self) -> &str {
            self.name
        }

        fn is_local(&self) -> bool {
            self.local
        }

        async fn fetch_episode_list(
            &self,
            _entry: &SourceEntry,
        ) -> bridge_traits::error::Result<Vec<RemoteEpisode>> {
            Ok(Vec::new())
        }

        async fn fetch_details(
            &self,
            _entry: &SourceEntry,
        ) -> bridge_traits::error::Result<EntryDetails> {
            Ok(EntryDetails::default())
        }

        async fn fetch_page_list(
            &self,
            _episode_url: &str,
        ) -> bridge_traits::error::Result<Vec<RemotePage>> {
            Ok(Vec::new())
        }
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::new()
            .with_source(Arc::new(NamedSource {
                id: 1,
                name: "Alpha",
                local: false,
            }))
            .with_source(Arc::new(NamedSource {
                id: 2,
                name: "Local",
                local: true,
            }))
    }

    fn owned(id: i64, entry: i64) -> Episode {
        let mut episode = episode(id, id as f64);
        episode.entry_id = EntryId(entry);
        episode
    }

    fn constituents() -> HashMap<EntryId, ConstituentEntry> {
        [
            ConstituentEntry::new(EntryId(10), SourceId(1), "/a", "Alpha Title"),
            ConstituentEntry::new(EntryId(20), SourceId(2), "/l", "Local Title"),
        ]
        .into_iter()
        .map(|entry| (entry.id, entry))
        .collect()
    }

    #[test]
    fn test_download_state_resolution() {
        let merged = MergedEntry::new(EntryId(1), "Merged");
        let episodes = vec![owned(1, 10), owned(2, 10), owned(3, 10), owned(4, 20)];
        let constituents = constituents();
        let sources = registry();
        let downloads = DownloadStatusSnapshot::new()
            .with_downloaded(DownloadKey::new(&episodes[0], "Alpha Title", SourceId(1)))
            .with_downloaded(DownloadKey::new(&episodes[1], "Alpha Title", SourceId(1)))
            .with_active(EpisodeId(2), DownloadState::Queued, 0);
        let context = ProjectionContext {
            merged_entry: &merged,
            episodes: &episodes,
            references: &[],
            constituents: &constituents,
            sources: &sources,
            downloads: &downloads,
        };

        let items = EpisodeListProjector::new(context).project(&SelectionController::new());

        let states: Vec<_> = items.iter().map(|item| item.download_state).collect();
        assert_eq!(
            states,
            vec![
                DownloadState::Downloaded,
                DownloadState::Queued,
                DownloadState::NotDownloaded,
                DownloadState::Downloaded,
            ]
        );
        assert_eq!(items[0].download_progress, 100);
        assert!(items[3].local);
        assert!(items.iter().all(|item| item.source_label.is_some()));
        assert_eq!(items[0].source_label.as_deref(), Some("Alpha"));
    }

    #[test]
    fn test_unknown_constituent_falls_back_to_merged_entry() {
        let merged = MergedEntry::new(EntryId(1), "Merged");
        let episodes = vec![owned(1, 99)];
        let constituents = HashMap::new();
        let sources = registry();
        let downloads = DownloadStatusSnapshot::new().with_downloaded(DownloadKey::new(
            &episodes[0],
            "Merged",
            MERGED_SOURCE_ID,
        ));
        let context = ProjectionContext {
            merged_entry: &merged,
            episodes: &episodes,
            references: &[],
            constituents: &constituents,
            sources: &sources,
            downloads: &downloads,
        };

        let items = EpisodeListProjector::new(context).project(&SelectionController::new());

        assert_eq!(items[0].download_state, DownloadState::Downloaded);
        assert_eq!(items[0].source_label, None);
    }

    #[test]
    fn test_single_source_merge_has_no_labels() {
        let merged = MergedEntry::new(EntryId(1), "Merged");
        let episodes = vec![owned(1, 10)];
        let constituents: HashMap<EntryId, ConstituentEntry> = constituents()
            .into_iter()
            .filter(|(id, _)| *id == EntryId(10))
            .collect();
        let sources = registry();
        let downloads = DownloadStatusSnapshot::new();
        let references = vec![MergeReference::self_placeholder(EntryId(1))];
        let mut selection = SelectionController::new();
        selection.set_visible(vec![EpisodeId(1)]);
        selection.toggle(0, true, false);
        let context = ProjectionContext {
            merged_entry: &merged,
            episodes: &episodes,
            references: &references,
            constituents: &constituents,
            sources: &sources,
            downloads: &downloads,
        };

        let items = EpisodeListProjector::new(context).project(&selection);

        assert_eq!(items[0].source_label, None);
        assert!(items[0].selected);
        assert_eq!(items[0].id(), EpisodeId(1));
    }
}
