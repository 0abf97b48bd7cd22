//! Composition of the episode-list stages into one render call.

use crate::dedupe::Deduplicator;
use crate::filter::FilterSortPipeline;
use crate::gaps::GapDetector;
use crate::item::EpisodeListEntry;
use crate::projector::{EpisodeListProjector, ProjectionContext};
use crate::selection::SelectionController;
use core_library::{EpisodeDisplaySettings, SortMode};
use tracing::debug;

/// Renders a merged entry's episode list.
///
/// Stages run in order: projection, filtering, dedupe, sorting, selection
/// refresh, then gap markers when sorting by number.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpisodeListPipeline;

impl EpisodeListPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Produces the visible rows and points `selection` at them.
    pub fn render(
        &self,
        context: ProjectionContext<'_>,
        settings: &EpisodeDisplaySettings,
        selection: &mut SelectionController,
    ) -> Vec<EpisodeListEntry> {
        let items = EpisodeListProjector::new(context).project(selection);
        let deduplicator = Deduplicator::new(settings.dedupe, context.references, &items);

        let visible = FilterSortPipeline::new(*settings)
            .with_deduplicator(deduplicator)
            .apply(items);
        selection.set_visible(visible.iter().map(|item| item.id()).collect());

        debug!(
            merged_entry_id = %context.merged_entry.id,
            episodes = context.episodes.len(),
            visible = visible.len(),
            "Rendered episode list"
        );

        if settings.sort_mode == SortMode::Number {
            GapDetector::new(settings.ascending).insert_markers(visible)
        } else {
            visible.into_iter().map(EpisodeListEntry::Episode).collect()
        }
    }
}
