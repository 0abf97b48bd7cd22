//! # Episode List Module
//!
//! Derives the display list of a merged entry from its stored episodes.
//!
//! ## Overview
//!
//! Nothing here is persisted or asynchronous: every stage is recomputed from
//! the current episodes, download status and settings whenever one of them
//! changes.
//!
//! ## Components
//!
//! - **Projector** (`projector`): Episode rows to list items with download
//!   state and source labels
//! - **Filter & Sort** (`filter`): Tri-state filters and stable sorting
//! - **Dedupe** (`dedupe`): Collapses copies of the same episode number
//! - **Gap Detection** (`gaps`): Missing-episode markers
//! - **Selection** (`selection`): Multi-select with range extension
//! - **Pipeline** (`view`): All of the above in one `render` call
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_episodes::{EpisodeListPipeline, ProjectionContext, SelectionController};
//!
//! let mut selection = SelectionController::new();
//! let rows = EpisodeListPipeline::new().render(
//!     ProjectionContext {
//!         merged_entry: &merged,
//!         episodes: &episodes,
//!         references: &references,
//!         constituents: &constituents,
//!         sources: registry.as_ref(),
//!         downloads: &download_status,
//!     },
//!     &merged.settings,
//!     &mut selection,
//! );
//! ```

pub mod dedupe;
pub mod download_status;
pub mod filter;
pub mod gaps;
pub mod item;
pub mod projector;
pub mod selection;
pub mod view;

pub use dedupe::Deduplicator;
pub use download_status::{ActiveDownload, DownloadKey, DownloadStatusIndex, DownloadStatusSnapshot};
pub use filter::FilterSortPipeline;
pub use gaps::GapDetector;
pub use item::{DownloadState, EpisodeListEntry, EpisodeListItem, MissingCountMarker};
pub use projector::{EpisodeListProjector, ProjectionContext};
pub use selection::{SelectionController, SelectionState};
pub use view::EpisodeListPipeline;
