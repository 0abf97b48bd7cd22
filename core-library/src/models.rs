//! Domain models for merged library entries
//!
//! A merged entry is an ordinary library entry whose episodes come from
//! several constituent entries, each living on its own source. The relation is
//! stored as one [`MergeReference`] per constituent plus a self-placeholder
//! reference pointing back at the merged entry.

use bridge_traits::source::{EntryDetails, EntryStatus, SourceEntry, SourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved source id carried by the self-placeholder reference of a merge.
pub const MERGED_SOURCE_ID: SourceId = SourceId(6969);

// =============================================================================
// ID Types
// =============================================================================

/// Row id of a library entry (merged or constituent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row id of a merge reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(pub i64);

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row id of an episode. Stable across re-syncs of the same natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(pub i64);

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Display Settings
// =============================================================================

/// Three-state filter: off, keep only matching, or drop matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    #[default]
    Disabled,
    IncludeOnly,
    ExcludeOnly,
}

impl TriState {
    /// Whether an item with the given property value passes this filter.
    pub fn accepts(&self, value: bool) -> bool {
        match self {
            TriState::Disabled => true,
            TriState::IncludeOnly => value,
            TriState::ExcludeOnly => !value,
        }
    }

    /// Cycles Disabled → IncludeOnly → ExcludeOnly → Disabled.
    pub fn next(&self) -> Self {
        match self {
            TriState::Disabled => TriState::IncludeOnly,
            TriState::IncludeOnly => TriState::ExcludeOnly,
            TriState::ExcludeOnly => TriState::Disabled,
        }
    }
}

/// Episode ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    SourceOrder,
    Number,
    UploadDate,
    Alphabetical,
}

/// How episodes published by more than one constituent are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeMode {
    /// Show every copy
    #[default]
    None,
    /// Keep the copy from the reference with the lowest priority value
    ByPriority,
    /// Keep the copy from the constituent with the most episodes
    MostEpisodes,
}

/// Per-entry filter, sort and dedupe settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDisplaySettings {
    pub unseen_filter: TriState,
    pub bookmark_filter: TriState,
    pub download_filter: TriState,
    pub sort_mode: SortMode,
    pub ascending: bool,
    pub dedupe: DedupeMode,
}

impl Default for EpisodeDisplaySettings {
    fn default() -> Self {
        Self {
            unseen_filter: TriState::Disabled,
            bookmark_filter: TriState::Disabled,
            download_filter: TriState::Disabled,
            sort_mode: SortMode::SourceOrder,
            ascending: true,
            dedupe: DedupeMode::None,
        }
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// The logical aggregate shown as a single library item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEntry {
    pub id: EntryId,
    pub title: String,
    pub favorite: bool,
    pub settings: EpisodeDisplaySettings,
}

impl MergedEntry {
    pub fn new(id: EntryId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            favorite: true,
            settings: EpisodeDisplaySettings::default(),
        }
    }
}

/// Link between a merged entry and one constituent entry, with that
/// constituent's sync settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReference {
    pub id: ReferenceId,
    pub merged_entry_id: EntryId,
    pub constituent_entry_id: EntryId,
    pub constituent_source_id: SourceId,
    /// Source-relative url of the constituent entry
    pub constituent_url: String,
    /// This constituent supplies the merged entry's metadata
    pub is_info_source: bool,
    /// Include this constituent when syncing
    pub receives_updates: bool,
    /// Enqueue newly synced episodes of this constituent for download
    pub downloads_enabled: bool,
    /// Lower values win when deduplicating by priority
    pub priority: i32,
}

impl MergeReference {
    /// Placeholder reference that points a merge back at itself.
    pub fn self_placeholder(merged_entry_id: EntryId) -> Self {
        Self {
            id: ReferenceId(0),
            merged_entry_id,
            constituent_entry_id: merged_entry_id,
            constituent_source_id: MERGED_SOURCE_ID,
            constituent_url: String::new(),
            is_info_source: false,
            receives_updates: false,
            downloads_enabled: false,
            priority: -1,
        }
    }

    /// Reference to a constituent with default settings.
    pub fn for_constituent(merged_entry_id: EntryId, constituent: &ConstituentEntry) -> Self {
        Self {
            id: ReferenceId(0),
            merged_entry_id,
            constituent_entry_id: constituent.id,
            constituent_source_id: constituent.source_id,
            constituent_url: constituent.url.clone(),
            is_info_source: false,
            receives_updates: true,
            downloads_enabled: true,
            priority: 0,
        }
    }

    pub fn is_self_placeholder(&self) -> bool {
        self.constituent_source_id == MERGED_SOURCE_ID
    }

    /// Copies only the user-editable settings fields from `other`.
    pub fn apply_settings(&mut self, other: &MergeReference) {
        self.is_info_source = other.is_info_source;
        self.receives_updates = other.receives_updates;
        self.downloads_enabled = other.downloads_enabled;
        self.priority = other.priority;
    }
}

/// Picks the reference that supplies metadata: the flagged info reference,
/// otherwise the first non-placeholder reference.
pub fn resolve_info_reference(references: &[MergeReference]) -> Option<&MergeReference> {
    references
        .iter()
        .find(|reference| reference.is_info_source && !reference.is_self_placeholder())
        .or_else(|| {
            references
                .iter()
                .find(|reference| !reference.is_self_placeholder())
        })
}

/// A library entry on a concrete source that is part of a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstituentEntry {
    pub id: EntryId,
    pub source_id: SourceId,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub status: EntryStatus,
    /// Details have been fetched from the source at least once
    pub initialized: bool,
    pub favorite: bool,
}

impl ConstituentEntry {
    pub fn new(
        id: EntryId,
        source_id: SourceId,
        url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source_id,
            url: url.into(),
            title: title.into(),
            author: None,
            description: None,
            thumbnail_url: None,
            status: EntryStatus::Unknown,
            initialized: false,
            favorite: false,
        }
    }

    /// The addressing information a source needs.
    pub fn source_entry(&self) -> SourceEntry {
        SourceEntry {
            url: self.url.clone(),
            title: self.title.clone(),
        }
    }

    /// Merges freshly fetched details into this entry and marks it initialized.
    /// An empty remote title keeps the local one.
    pub fn apply_details(&mut self, details: &EntryDetails) {
        if !details.title.trim().is_empty() {
            self.title = details.title.clone();
        }
        if details.author.is_some() {
            self.author = details.author.clone();
        }
        if details.description.is_some() {
            self.description = details.description.clone();
        }
        if details.thumbnail_url.is_some() {
            self.thumbnail_url = details.thumbnail_url.clone();
        }
        self.status = details.status;
        self.initialized = true;
    }
}

/// Identity of an episode across re-fetches, independent of row ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub name: String,
    pub scanlator: Option<String>,
}

impl NaturalKey {
    pub fn new(name: impl Into<String>, scanlator: Option<String>) -> Self {
        Self {
            name: name.into(),
            scanlator: normalize_scanlator(scanlator),
        }
    }
}

/// Blank scanlator strings are treated as absent.
pub fn normalize_scanlator(scanlator: Option<String>) -> Option<String> {
    scanlator
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A persisted episode row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    /// Constituent entry this episode belongs to
    pub entry_id: EntryId,
    pub url: String,
    pub name: String,
    /// Published number; negative when unrecognised
    pub number: f64,
    pub scanlator: Option<String>,
    /// Upload time in Unix milliseconds
    pub uploaded_at: i64,
    /// When this row was first inserted, Unix milliseconds
    pub fetched_at: i64,
    pub read: bool,
    pub bookmarked: bool,
    /// Position in the constituent's remote listing
    pub source_order: i64,
}

impl Episode {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(self.name.clone(), self.scanlator.clone())
    }

    pub fn is_recognized_number(&self) -> bool {
        self.number >= 0.0
    }
}

/// Episode data before a row id has been assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEpisode {
    pub entry_id: EntryId,
    pub url: String,
    pub name: String,
    pub number: f64,
    pub scanlator: Option<String>,
    pub uploaded_at: i64,
    pub fetched_at: i64,
    pub source_order: i64,
}

impl NewEpisode {
    pub fn into_episode(self, id: EpisodeId) -> Episode {
        Episode {
            id,
            entry_id: self.entry_id,
            url: self.url,
            name: self.name,
            number: self.number,
            scanlator: self.scanlator,
            uploaded_at: self.uploaded_at,
            fetched_at: self.fetched_at,
            read: false,
            bookmarked: false,
            source_order: self.source_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(id: i64, source: i64, info: bool) -> MergeReference {
        MergeReference {
            id: ReferenceId(id),
            merged_entry_id: EntryId(1),
            constituent_entry_id: EntryId(100 + id),
            constituent_source_id: SourceId(source),
            constituent_url: format!("/entry/{}", id),
            is_info_source: info,
            receives_updates: true,
            downloads_enabled: false,
            priority: id as i32,
        }
    }

    #[test]
    fn test_tri_state_accepts() {
        assert!(TriState::Disabled.accepts(true));
        assert!(TriState::Disabled.accepts(false));
        assert!(TriState::IncludeOnly.accepts(true));
        assert!(!TriState::IncludeOnly.accepts(false));
        assert!(!TriState::ExcludeOnly.accepts(true));
        assert!(TriState::ExcludeOnly.accepts(false));
    }

    #[test]
    fn test_tri_state_cycles() {
        assert_eq!(TriState::Disabled.next(), TriState::IncludeOnly);
        assert_eq!(TriState::IncludeOnly.next(), TriState::ExcludeOnly);
        assert_eq!(TriState::ExcludeOnly.next(), TriState::Disabled);
    }

    #[test]
    fn test_info_reference_prefers_flag() {
        let mut placeholder = MergeReference::self_placeholder(EntryId(1));
        placeholder.is_info_source = true;
        let refs = vec![placeholder, reference(1, 10, false), reference(2, 20, true)];

        let info = resolve_info_reference(&refs).unwrap();
        assert_eq!(info.id, ReferenceId(2));
    }

    #[test]
    fn test_info_reference_falls_back_to_first_constituent() {
        let refs = vec![
            MergeReference::self_placeholder(EntryId(1)),
            reference(1, 10, false),
            reference(2, 20, false),
        ];

        let info = resolve_info_reference(&refs).unwrap();
        assert_eq!(info.id, ReferenceId(1));
    }

    #[test]
    fn test_info_reference_absent_for_placeholder_only() {
        let refs = vec![MergeReference::self_placeholder(EntryId(1))];
        assert!(resolve_info_reference(&refs).is_none());
    }

    #[test]
    fn test_apply_settings_leaves_identity_untouched() {
        let mut stored = reference(1, 10, false);
        let mut edited = reference(9, 99, true);
        edited.downloads_enabled = true;
        edited.priority = 7;

        stored.apply_settings(&edited);

        assert_eq!(stored.id, ReferenceId(1));
        assert_eq!(stored.constituent_source_id, SourceId(10));
        assert!(stored.is_info_source);
        assert!(stored.downloads_enabled);
        assert_eq!(stored.priority, 7);
    }

    #[test]
    fn test_natural_key_normalizes_blank_scanlator() {
        assert_eq!(
            NaturalKey::new("Episode 1", Some("  ".to_string())),
            NaturalKey::new("Episode 1", None)
        );
        assert_eq!(
            NaturalKey::new("Episode 1", Some(" Group ".to_string())).scanlator,
            Some("Group".to_string())
        );
    }

    #[test]
    fn test_apply_details_marks_initialized() {
        let mut entry = ConstituentEntry::new(EntryId(5), SourceId(10), "/x", "Local title");
        entry.apply_details(&EntryDetails {
            title: String::new(),
            author: Some("Author".to_string()),
            status: EntryStatus::Ongoing,
            ..Default::default()
        });

        assert!(entry.initialized);
        assert_eq!(entry.title, "Local title");
        assert_eq!(entry.author.as_deref(), Some("Author"));
        assert_eq!(entry.status, EntryStatus::Ongoing);
    }

    #[test]
    fn test_display_settings_serialize_snake_case() {
        let settings = EpisodeDisplaySettings {
            unseen_filter: TriState::IncludeOnly,
            sort_mode: SortMode::UploadDate,
            dedupe: DedupeMode::MostEpisodes,
            ..Default::default()
        };

        let json = serde_json::to_value(settings).unwrap();
        assert_eq!(json["unseen_filter"], "include_only");
        assert_eq!(json["sort_mode"], "upload_date");
        assert_eq!(json["dedupe"], "most_episodes");
        assert_eq!(json["ascending"], true);
    }
}
