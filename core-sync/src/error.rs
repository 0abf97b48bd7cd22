use bridge_traits::{BridgeError, SourceId};
use core_library::{EntryId, Episode, LibraryError, ReferenceId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Merged entry {merged_entry_id} has no constituent references")]
    CorruptedMerge { merged_entry_id: EntryId },

    #[error("Constituent {constituent_entry_id} on source {source_id} failed: {source}")]
    ConstituentFetch {
        constituent_entry_id: EntryId,
        source_id: SourceId,
        #[source]
        source: BridgeError,
    },

    #[error("Source {0} is not installed")]
    SourceNotFound(SourceId),

    #[error("Constituent {constituent_entry_id} timed out after {secs} seconds")]
    Timeout {
        constituent_entry_id: EntryId,
        secs: u64,
    },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Sync finished with {} episodes synced; last failure: {last_error}", .episodes.len())]
    PartialFailure {
        episodes: Vec<Episode>,
        #[source]
        last_error: Box<SyncError>,
    },

    #[error("Reference {0} is the last constituent of its merge")]
    LastReference(ReferenceId),

    #[error("Sync task failed: {0}")]
    TaskFailed(String),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

impl SyncError {
    /// Episodes that were synced even though the run failed. Empty for every
    /// variant except `PartialFailure`.
    pub fn synced_episodes(&self) -> &[Episode] {
        match self {
            SyncError::PartialFailure { episodes, .. } => episodes,
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
