//! Display-ready episode list items.

use core_library::{EntryId, Episode, EpisodeId};
use serde::{Deserialize, Serialize};

/// Download status shown next to an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    #[default]
    NotDownloaded,
    Queued,
    Downloading,
    Downloaded,
    Error,
}

impl DownloadState {
    /// States reported by the live download queue rather than by storage.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            DownloadState::Queued | DownloadState::Downloading | DownloadState::Error
        )
    }
}

/// One episode as a list row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeListItem {
    pub episode: Episode,
    pub download_state: DownloadState,
    /// 0 to 100
    pub download_progress: u8,
    pub selected: bool,
    /// Display name of the constituent's source, set for merges spanning
    /// several sources
    pub source_label: Option<String>,
    /// Backed by local storage; such items always count as downloaded
    pub local: bool,
}

impl EpisodeListItem {
    pub fn id(&self) -> EpisodeId {
        self.episode.id
    }

    pub fn entry_id(&self) -> EntryId {
        self.episode.entry_id
    }

    pub fn is_downloaded(&self) -> bool {
        self.download_state == DownloadState::Downloaded
    }
}

/// Separator announcing how many episodes are missing between two rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCountMarker {
    /// `"{lower_id}-{higher_id}"`, with `none` for the list boundary
    pub id: String,
    pub count: u32,
}

/// A row of the rendered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EpisodeListEntry {
    Episode(EpisodeListItem),
    MissingCount(MissingCountMarker),
}

impl EpisodeListEntry {
    pub fn as_item(&self) -> Option<&EpisodeListItem> {
        match self {
            EpisodeListEntry::Episode(item) => Some(item),
            EpisodeListEntry::MissingCount(_) => None,
        }
    }

    pub fn as_marker(&self) -> Option<&MissingCountMarker> {
        match self {
            EpisodeListEntry::Episode(_) => None,
            EpisodeListEntry::MissingCount(marker) => Some(marker),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::item;
    use super::*;

    #[test]
    fn test_active_states() {
        assert!(DownloadState::Queued.is_active());
        assert!(DownloadState::Error.is_active());
        assert!(!DownloadState::Downloaded.is_active());
        assert!(!DownloadState::NotDownloaded.is_active());
    }

    #[test]
    fn test_entry_serializes_with_kind_tag() {
        let marker = EpisodeListEntry::MissingCount(MissingCountMarker {
            id: "1-2".to_string(),
            count: 3,
        });
        let json = serde_json::to_value(&marker).unwrap();
        assert_eq!(json["kind"], "missing_count");
        assert_eq!(json["count"], 3);

        let row = EpisodeListEntry::Episode(item(1, 1.0));
        assert_eq!(row.as_item().map(EpisodeListItem::id), Some(EpisodeId(1)));
        assert!(row.as_marker().is_none());
    }
}
