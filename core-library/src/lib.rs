//! # Library Module
//!
//! Data model of merged library entries and the repository traits the engine
//! reads and writes through.
//!
//! ## Overview
//!
//! This module provides:
//! - Entry, reference and episode models with their id newtypes
//! - The info-reference precedence rule
//! - Repository traits for merge references, constituent entries and
//!   episodes, each with an in-memory implementation
//!
//! Persistence proper belongs to the host: it implements the repository
//! traits over its own database.

pub mod error;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use models::{
    resolve_info_reference, ConstituentEntry, DedupeMode, EntryId, Episode,
    EpisodeDisplaySettings, EpisodeId, MergeReference, MergedEntry, NaturalKey, NewEpisode,
    ReferenceId, SortMode, TriState, MERGED_SOURCE_ID,
};
pub use repositories::{
    EntryRepository, EpisodeRepository, InMemoryEntryRepository, InMemoryEpisodeRepository,
    InMemoryMergeReferenceStore, MergeReferenceStore,
};
