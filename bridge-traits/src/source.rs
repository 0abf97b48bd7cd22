//! Content Source Abstractions
//!
//! A [`Source`] is one remote site (or the local-storage source) that can list
//! the episodes of an entry, describe the entry, and list the pages of an
//! episode. Concrete sources are resolved at runtime by id through a
//! [`SourceResolver`], so the engine never knows which site it is talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Numeric identifier of a source, as assigned by the host's extension system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub i64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The part of a library entry a source needs to address it remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Source-relative url or key of the entry
    pub url: String,
    /// Entry title as stored locally
    pub title: String,
}

/// Publication status reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    Unknown,
    Ongoing,
    Completed,
    Cancelled,
    OnHiatus,
}

/// Entry metadata returned by [`Source::fetch_details`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryDetails {
    pub title: String,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub status: EntryStatus,
    pub thumbnail_url: Option<String>,
}

/// One row of a remote episode listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEpisode {
    /// Source-relative url of the episode
    pub url: String,
    pub name: String,
    /// Episode number as published; negative when the source could not tell
    pub number: f64,
    /// Upload time in Unix milliseconds, 0 when unknown
    pub uploaded_at: i64,
    pub scanlator: Option<String>,
}

/// One page of an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePage {
    pub index: u32,
    pub url: String,
    pub image_url: Option<String>,
}

/// Content source trait
///
/// Implemented once per site by the host's scraping adapters. Every method may
/// fail with a network or parse error; the sync engine isolates such failures
/// to the constituent being fetched.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::source::{Source, SourceEntry};
///
/// async fn count_episodes(source: &dyn Source, entry: &SourceEntry) -> usize {
///     source.fetch_episode_list(entry).await.map(|list| list.len()).unwrap_or(0)
/// }
/// ```
#[async_trait]
pub trait Source: Send + Sync {
    /// Identifier this source is registered under
    fn id(&self) -> SourceId;

    /// Human readable name, used for labels
    fn name(&self) -> &str;

    /// Whether the source reads from local storage; local episodes count as
    /// downloaded.
    fn is_local(&self) -> bool {
        false
    }

    /// Fetch the full episode listing of an entry. Index 0 is the first row of
    /// the listing as the site presents it.
    async fn fetch_episode_list(&self, entry: &SourceEntry) -> Result<Vec<RemoteEpisode>>;

    /// Fetch entry metadata.
    async fn fetch_details(&self, entry: &SourceEntry) -> Result<EntryDetails>;

    /// Fetch the page list of one episode.
    async fn fetch_page_list(&self, episode_url: &str) -> Result<Vec<RemotePage>>;
}

/// Runtime lookup of sources by id.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, id: SourceId) -> Option<Arc<dyn Source>>;

    /// Display name of a source, falling back to its numeric id.
    fn display_name(&self, id: SourceId) -> String {
        self.resolve(id)
            .map(|source| source.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Whether the id belongs to a local-storage source.
    fn is_local(&self, id: SourceId) -> bool {
        self.resolve(id).map(|source| source.is_local()).unwrap_or(false)
    }
}

/// Map-backed [`SourceResolver`].
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: HashMap<SourceId, Arc<dyn Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own id, replacing any previous entry.
    pub fn register(&mut self, source: Arc<dyn Source>) {
        let id = source.id();
        if self.sources.insert(id, source).is_some() {
            tracing::debug!(source_id = %id, "Replaced registered source");
        }
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_source(mut self, source: Arc<dyn Source>) -> Self {
        self.register(source);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl SourceResolver for SourceRegistry {
    fn resolve(&self, id: SourceId) -> Option<Arc<dyn Source>> {
        self.sources.get(&id).cloned()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.sources.keys().copied().collect();
        ids.sort();
        f.debug_struct("SourceRegistry").field("sources", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSource {
        id: i64,
        name: &'static str,
        local: bool,
    }

    #[async_trait]
    impl Source for StubSource {
        fn id(&self) -> SourceId {
            SourceId(self.id)
        }

        fn name(&self) -> &str {
            self.name
        }

        fn is_local(&self) -> bool {
            self.local
        }

        async fn fetch_episode_list(&self, entry: &SourceEntry) -> Result<Vec<RemoteEpisode>> {
            Ok(vec![RemoteEpisode {
                url: format!("{}/1", entry.url),
                name: "Episode 1".to_string(),
                number: 1.0,
                uploaded_at: 0,
                scanlator: None,
            }])
        }

        async fn fetch_details(&self, entry: &SourceEntry) -> Result<EntryDetails> {
            Ok(EntryDetails {
                title: entry.title.clone(),
                ..Default::default()
            })
        }

        async fn fetch_page_list(&self, _episode_url: &str) -> Result<Vec<RemotePage>> {
            Ok(Vec::new())
        }
    }

    fn stub(id: i64, name: &'static str, local: bool) -> Arc<dyn Source> {
        Arc::new(StubSource { id, name, local })
    }

    #[test]
    fn test_registry_resolves_registered_sources() {
        let registry = SourceRegistry::new()
            .with_source(stub(1, "Alpha", false))
            .with_source(stub(2, "Local", true));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.display_name(SourceId(1)), "Alpha");
        assert!(registry.is_local(SourceId(2)));
        assert!(!registry.is_local(SourceId(1)));
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = SourceRegistry::new();
        registry.register(stub(1, "Old", false));
        registry.register(stub(1, "New", false));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.display_name(SourceId(1)), "New");
    }

    #[test]
    fn test_unknown_source_falls_back_to_id() {
        let registry = SourceRegistry::new();

        assert!(registry.resolve(SourceId(42)).is_none());
        assert_eq!(registry.display_name(SourceId(42)), "42");
        assert!(!registry.is_local(SourceId(42)));
    }

    #[core_async::test]
    async fn test_resolved_source_fetches_listing() {
        let registry = SourceRegistry::new().with_source(stub(7, "Stub", false));
        let source = registry.resolve(SourceId(7)).unwrap();

        let entry = SourceEntry {
            url: "/series/abc".to_string(),
            title: "Abc".to_string(),
        };
        let listing = source.fetch_episode_list(&entry).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].url, "/series/abc/1");
    }
}
