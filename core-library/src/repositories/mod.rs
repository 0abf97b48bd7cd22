//! # Repository Pattern Implementation
//!
//! Repository traits for the data the merged-entry engine touches, plus
//! in-memory implementations.
//!
//! ## Architecture
//!
//! - Traits define the interface; the host implements them over its database
//! - In-memory implementations keep state behind an async `RwLock` and are
//!   used by tests and hosts without persistence
//! - All operations return `Result<T>` for error handling
//!
//! ## Available Repositories
//!
//! - `MergeReferenceStore` - References linking a merged entry to its constituents
//! - `EntryRepository` - Constituent library entries
//! - `EpisodeRepository` - Episode rows of constituent entries

pub mod entry;
pub mod episode;
pub mod merge_reference;

pub use entry::{EntryRepository, InMemoryEntryRepository};
pub use episode::{EpisodeRepository, InMemoryEpisodeRepository};
pub use merge_reference::{InMemoryMergeReferenceStore, MergeReferenceStore};
