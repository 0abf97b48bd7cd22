//! Collapses episodes that several constituents publish under the same number.

use crate::item::EpisodeListItem;
use core_library::{DedupeMode, EntryId, MergeReference};
use std::collections::{HashMap, HashSet};

/// Ranks constituents and keeps the best-ranked copy of each episode number.
///
/// Ranks are computed from the full projected list so that filters do not
/// change which copy wins.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    mode: DedupeMode,
    /// Lower is better
    ranks: HashMap<EntryId, (i64, i64)>,
}

impl Deduplicator {
    pub fn new(mode: DedupeMode, references: &[MergeReference], all_items: &[EpisodeListItem]) -> Self {
        let priorities: HashMap<EntryId, i64> = references
            .iter()
            .filter(|reference| !reference.is_self_placeholder())
            .map(|reference| (reference.constituent_entry_id, i64::from(reference.priority)))
            .collect();

        let mut counts: HashMap<EntryId, i64> = HashMap::new();
        for item in all_items {
            *counts.entry(item.entry_id()).or_default() += 1;
        }

        let ranks = counts
            .keys()
            .map(|entry_id| {
                let priority = priorities.get(entry_id).copied().unwrap_or(i64::MAX);
                let count = counts.get(entry_id).copied().unwrap_or_default();
                let rank = match mode {
                    DedupeMode::MostEpisodes => (-count, priority),
                    DedupeMode::ByPriority | DedupeMode::None => (priority, 0),
                };
                (*entry_id, rank)
            })
            .collect();

        Self { mode, ranks }
    }

    pub fn mode(&self) -> DedupeMode {
        self.mode
    }

    /// Drops every copy of a recognised episode number except the best-ranked
    /// one; ties go to the earlier item. Surviving items keep their order.
    pub fn apply(&self, items: Vec<EpisodeListItem>) -> Vec<EpisodeListItem> {
        if self.mode == DedupeMode::None {
            return items;
        }

        let mut winners: HashMap<u64, (usize, (i64, i64))> = HashMap::new();
        for (position, item) in items.iter().enumerate() {
            let Some(key) = number_key(item) else {
                continue;
            };
            let rank = self
                .ranks
                .get(&item.entry_id())
                .copied()
                .unwrap_or((i64::MAX, i64::MAX));
            winners
                .entry(key)
                .and_modify(|best| {
                    if rank < best.1 {
                        *best = (position, rank);
                    }
                })
                .or_insert((position, rank));
        }

        let keep: HashSet<usize> = winners.values().map(|(position, _)| *position).collect();
        items
            .into_iter()
            .enumerate()
            .filter(|(position, item)| number_key(item).is_none() || keep.contains(position))
            .map(|(_, item)| item)
            .collect()
    }
}

fn number_key(item: &EpisodeListItem) -> Option<u64> {
    if !item.episode.is_recognized_number() {
        return None;
    }
    // -0.0 and 0.0 share a key
    let number = if item.episode.number == 0.0 {
        0.0
    } else {
        item.episode.number
    };
    Some(number.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::item;
    use bridge_traits::SourceId;

    fn from_entry(id: i64, number: f64, entry: i64) -> EpisodeListItem {
        let mut item = item(id, number);
        item.episode.entry_id = EntryId(entry);
        item
    }

    fn reference(entry: i64, priority: i32) -> MergeReference {
        MergeReference {
            id: core_library::ReferenceId(entry),
            merged_entry_id: EntryId(1),
            constituent_entry_id: EntryId(entry),
            constituent_source_id: SourceId(entry),
            constituent_url: String::new(),
            is_info_source: false,
            receives_updates: true,
            downloads_enabled: true,
            priority,
        }
    }

    fn ids(items: &[EpisodeListItem]) -> Vec<i64> {
        items.iter().map(|item| item.id().0).collect()
    }

    #[test]
    fn test_by_priority_keeps_lowest_priority_value() {
        let items = vec![
            from_entry(1, 1.0, 20),
            from_entry(2, 1.0, 30),
            from_entry(3, 2.0, 30),
        ];
        let references = vec![reference(20, 1), reference(30, 0)];

        let kept = Deduplicator::new(DedupeMode::ByPriority, &references, &items).apply(items);

        assert_eq!(ids(&kept), vec![2, 3]);
    }

    #[test]
    fn test_most_episodes_prefers_larger_constituent() {
        let all = vec![
            from_entry(1, 1.0, 20),
            from_entry(2, 1.0, 30),
            from_entry(3, 2.0, 30),
        ];
        let references = vec![reference(20, 0), reference(30, 1)];
        let dedupe = Deduplicator::new(DedupeMode::MostEpisodes, &references, &all);

        // Entry 30 wins on its full count even when filtering hid episode 3.
        let kept = dedupe.apply(vec![from_entry(1, 1.0, 20), from_entry(2, 1.0, 30)]);

        assert_eq!(ids(&kept), vec![2]);
    }

    #[test]
    fn test_unrecognised_numbers_are_never_collapsed() {
        let items = vec![from_entry(1, -1.0, 20), from_entry(2, -1.0, 30)];
        let references = vec![reference(20, 0), reference(30, 1)];

        let kept = Deduplicator::new(DedupeMode::ByPriority, &references, &items).apply(items);

        assert_eq!(ids(&kept), vec![1, 2]);
    }

    #[test]
    fn test_none_mode_is_identity() {
        let items = vec![from_entry(1, 1.0, 20), from_entry(2, 1.0, 30)];

        let kept = Deduplicator::new(DedupeMode::None, &[], &items).apply(items);

        assert_eq!(ids(&kept), vec![1, 2]);
    }
}
