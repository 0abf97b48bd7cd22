//! Download status lookups used during projection.
//!
//! Downloaded files are matched by a natural key, never by episode id: a
//! download survives the episode row being recreated by a later sync.

use crate::item::DownloadState;
use bridge_traits::SourceId;
use core_library::models::normalize_scanlator;
use core_library::{Episode, EpisodeId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identity of a downloaded episode on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadKey {
    pub episode_name: String,
    pub scanlator: Option<String>,
    pub entry_title: String,
    pub source_id: SourceId,
}

impl DownloadKey {
    pub fn new(episode: &Episode, entry_title: impl Into<String>, source_id: SourceId) -> Self {
        Self {
            episode_name: episode.name.clone(),
            scanlator: normalize_scanlator(episode.scanlator.clone()),
            entry_title: entry_title.into(),
            source_id,
        }
    }
}

/// A record from the live download queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDownload {
    /// One of `Queued`, `Downloading` or `Error`
    pub state: DownloadState,
    pub progress: u8,
}

/// Host view of downloaded files and the download queue.
pub trait DownloadStatusIndex: Send + Sync {
    /// Whether a finished download exists for `key`.
    fn is_downloaded(&self, key: &DownloadKey) -> bool;

    /// The queue record for `episode_id`, if it is queued, downloading or failed.
    fn active_download(&self, episode_id: EpisodeId) -> Option<ActiveDownload>;
}

/// Snapshot implementation of [`DownloadStatusIndex`].
#[derive(Debug, Clone, Default)]
pub struct DownloadStatusSnapshot {
    downloaded: HashSet<DownloadKey>,
    active: HashMap<EpisodeId, ActiveDownload>,
}

impl DownloadStatusSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_downloaded(mut self, key: DownloadKey) -> Self {
        self.downloaded.insert(key);
        self
    }

    /// Records a queue entry. Progress is clamped to 100.
    pub fn with_active(mut self, episode_id: EpisodeId, state: DownloadState, progress: u8) -> Self {
        self.active.insert(
            episode_id,
            ActiveDownload {
                state,
                progress: progress.min(100),
            },
        );
        self
    }
}

impl DownloadStatusIndex for DownloadStatusSnapshot {
    fn is_downloaded(&self, key: &DownloadKey) -> bool {
        self.downloaded.contains(key)
    }

    fn active_download(&self, episode_id: EpisodeId) -> Option<ActiveDownload> {
        self.active
            .get(&episode_id)
            .copied()
            .filter(|download| download.state.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::episode;

    #[test]
    fn test_key_ignores_blank_scanlator() {
        let mut blank = episode(1, 1.0);
        blank.scanlator = Some("  ".to_string());
        let plain = episode(2, 1.0);

        assert_eq!(
            DownloadKey::new(&blank, "Title", SourceId(1)),
            DownloadKey::new(&plain, "Title", SourceId(1))
        );
    }

    #[test]
    fn test_snapshot_lookups() {
        let ep = episode(1, 1.0);
        let index = DownloadStatusSnapshot::new()
            .with_downloaded(DownloadKey::new(&ep, "Title", SourceId(1)))
            .with_active(EpisodeId(2), DownloadState::Downloading, 140)
            .with_active(EpisodeId(3), DownloadState::Downloaded, 100);

        assert!(index.is_downloaded(&DownloadKey::new(&ep, "Title", SourceId(1))));
        assert!(!index.is_downloaded(&DownloadKey::new(&ep, "Other", SourceId(1))));
        assert_eq!(
            index.active_download(EpisodeId(2)).map(|d| d.progress),
            Some(100)
        );
        assert_eq!(index.active_download(EpisodeId(3)), None);
    }
}
