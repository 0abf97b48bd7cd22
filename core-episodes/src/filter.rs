//! # Filtering and Sorting
//!
//! [`FilterSortPipeline`] is a pure function of the projected items and the
//! merged entry's [`EpisodeDisplaySettings`]:
//!
//! 1. Three tri-state filters (unseen, bookmarked, downloaded), combined with
//!    AND. Local-storage items are exempt from the download filter.
//! 2. An optional [`Deduplicator`] pass.
//! 3. A stable sort by the configured mode. Descending order reverses the
//!    comparator, so equal items keep their original relative order either way.

use crate::dedupe::Deduplicator;
use crate::item::EpisodeListItem;
use core_library::{EpisodeDisplaySettings, SortMode};
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct FilterSortPipeline {
    settings: EpisodeDisplaySettings,
    deduplicator: Option<Deduplicator>,
}

impl FilterSortPipeline {
    pub fn new(settings: EpisodeDisplaySettings) -> Self {
        Self {
            settings,
            deduplicator: None,
        }
    }

    pub fn with_deduplicator(mut self, deduplicator: Deduplicator) -> Self {
        self.deduplicator = Some(deduplicator);
        self
    }

    pub fn settings(&self) -> &EpisodeDisplaySettings {
        &self.settings
    }

    pub fn accepts(&self, item: &EpisodeListItem) -> bool {
        let settings = &self.settings;
        settings.unseen_filter.accepts(!item.episode.read)
            && settings.bookmark_filter.accepts(item.episode.bookmarked)
            && (item.local || settings.download_filter.accepts(item.is_downloaded()))
    }

    pub fn apply(&self, items: Vec<EpisodeListItem>) -> Vec<EpisodeListItem> {
        let mut items: Vec<EpisodeListItem> =
            items.into_iter().filter(|item| self.accepts(item)).collect();

        if let Some(deduplicator) = &self.deduplicator {
            items = deduplicator.apply(items);
        }

        sort_items(&mut items, self.settings.sort_mode, self.settings.ascending);
        items
    }
}

/// Stable sort of `items` by `mode`.
pub fn sort_items(items: &mut [EpisodeListItem], mode: SortMode, ascending: bool) {
    if ascending {
        items.sort_by(|a, b| compare(a, b, mode));
    } else {
        items.sort_by(|a, b| compare(b, a, mode));
    }
}

fn compare(a: &EpisodeListItem, b: &EpisodeListItem, mode: SortMode) -> Ordering {
    let (a, b) = (&a.episode, &b.episode);
    match mode {
        SortMode::SourceOrder => a.source_order.cmp(&b.source_order),
        SortMode::Number => a.number.total_cmp(&b.number),
        SortMode::UploadDate => a.uploaded_at.cmp(&b.uploaded_at),
        SortMode::Alphabetical => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::item;
    use crate::item::DownloadState;
    use core_library::TriState;

    fn ids(items: &[EpisodeListItem]) -> Vec<i64> {
        items.iter().map(|item| item.id().0).collect()
    }

    fn settings() -> EpisodeDisplaySettings {
        EpisodeDisplaySettings::default()
    }

    #[test]
    fn test_unseen_and_bookmarked_filters_combine() {
        let unseen = [true, false, true];
        let bookmarked = [true, true, false];
        let items: Vec<EpisodeListItem> = (0..3)
            .map(|i| {
                let mut item = item(i, i as f64);
                item.episode.read = !unseen[i as usize];
                item.episode.bookmarked = bookmarked[i as usize];
                item
            })
            .collect();

        let pipeline = FilterSortPipeline::new(EpisodeDisplaySettings {
            unseen_filter: TriState::IncludeOnly,
            bookmark_filter: TriState::IncludeOnly,
            ..settings()
        });

        assert_eq!(ids(&pipeline.apply(items)), vec![0]);
    }

    #[test]
    fn test_download_filter_exempts_local_items() {
        let mut downloaded = item(1, 1.0);
        downloaded.download_state = DownloadState::Downloaded;
        let remote = item(2, 2.0);
        let mut local = item(3, 3.0);
        local.local = true;

        let only_downloaded = FilterSortPipeline::new(EpisodeDisplaySettings {
            download_filter: TriState::IncludeOnly,
            ..settings()
        });
        let not_downloaded = FilterSortPipeline::new(EpisodeDisplaySettings {
            download_filter: TriState::ExcludeOnly,
            ..settings()
        });
        let items = vec![downloaded, remote, local];

        assert_eq!(ids(&only_downloaded.apply(items.clone())), vec![1, 3]);
        assert_eq!(ids(&not_downloaded.apply(items)), vec![2, 3]);
    }

    #[test]
    fn test_number_sort_both_directions() {
        let items = vec![item(1, 2.0), item(2, 1.5), item(3, 10.0)];

        let ascending = FilterSortPipeline::new(EpisodeDisplaySettings {
            sort_mode: SortMode::Number,
            ..settings()
        });
        let descending = FilterSortPipeline::new(EpisodeDisplaySettings {
            sort_mode: SortMode::Number,
            ascending: false,
            ..settings()
        });

        assert_eq!(ids(&ascending.apply(items.clone())), vec![2, 1, 3]);
        assert_eq!(ids(&descending.apply(items)), vec![3, 1, 2]);
    }

    #[test]
    fn test_ties_keep_original_order() {
        let items = vec![item(1, 1.0), item(2, 1.0), item(3, 0.0)];

        let mut ascending = items.clone();
        sort_items(&mut ascending, SortMode::Number, true);
        let mut descending = items;
        sort_items(&mut descending, SortMode::Number, false);

        assert_eq!(ids(&ascending), vec![3, 1, 2]);
        assert_eq!(ids(&descending), vec![1, 2, 3]);
    }

    #[test]
    fn test_alphabetical_ignores_case() {
        let mut items = vec![item(1, 1.0), item(2, 2.0), item(3, 3.0)];
        items[0].episode.name = "beta".to_string();
        items[1].episode.name = "Alpha".to_string();
        items[2].episode.name = "Gamma".to_string();

        sort_items(&mut items, SortMode::Alphabetical, true);

        assert_eq!(ids(&items), vec![2, 1, 3]);
    }

    #[test]
    fn test_upload_date_and_source_order() {
        let mut items = vec![item(1, 1.0), item(2, 2.0)];
        items[0].episode.uploaded_at = 50;
        items[1].episode.uploaded_at = 10;

        sort_items(&mut items, SortMode::UploadDate, true);
        assert_eq!(ids(&items), vec![2, 1]);

        sort_items(&mut items, SortMode::SourceOrder, false);
        assert_eq!(ids(&items), vec![2, 1]);
    }
}
