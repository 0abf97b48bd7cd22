//! Missing-episode markers between adjacent rows of a number-sorted list.

use crate::item::{EpisodeListEntry, EpisodeListItem, MissingCountMarker};

/// Inserts [`MissingCountMarker`]s into an already filtered and sorted list.
#[derive(Debug, Clone, Copy)]
pub struct GapDetector {
    ascending: bool,
}

impl GapDetector {
    pub fn new(ascending: bool) -> Self {
        Self { ascending }
    }

    /// Wraps `items` as list entries, adding a marker wherever whole episode
    /// numbers are skipped, plus one at the low end of the list when it does
    /// not start at episode 1.
    pub fn insert_markers(&self, items: Vec<EpisodeListItem>) -> Vec<EpisodeListEntry> {
        let mut entries = Vec::with_capacity(items.len() + 1);
        let mut previous: Option<&EpisodeListItem> = None;

        for item in &items {
            match previous {
                None if self.ascending => entries.extend(missing_before(None, item)),
                None => {}
                Some(before) => {
                    let (lower, higher) = if self.ascending {
                        (before, item)
                    } else {
                        (item, before)
                    };
                    entries.extend(missing_before(Some(lower), higher));
                }
            }
            entries.push(EpisodeListEntry::Episode(item.clone()));
            previous = Some(item);
        }

        if !self.ascending {
            if let Some(last) = previous {
                entries.extend(missing_before(None, last));
            }
        }
        entries
    }
}

/// Episodes skipped between `lower` and `higher`; `lower` is `None` at the
/// low end of the list.
pub fn missing_count(lower: Option<f64>, higher: f64) -> u32 {
    if higher < 0.0 || lower.is_some_and(|number| number < 0.0) {
        return 0;
    }
    let higher = higher.floor();
    let gap = match lower {
        Some(lower) => higher - lower.floor() - 1.0,
        None => higher - 1.0,
    };
    if gap > 0.0 {
        gap as u32
    } else {
        0
    }
}

fn missing_before(
    lower: Option<&EpisodeListItem>,
    higher: &EpisodeListItem,
) -> Option<EpisodeListEntry> {
    let count = missing_count(lower.map(|item| item.episode.number), higher.episode.number);
    if count == 0 {
        return None;
    }
    let lower_id = lower.map_or_else(|| "none".to_string(), |item| item.id().to_string());
    Some(EpisodeListEntry::MissingCount(MissingCountMarker {
        id: format!("{}-{}", lower_id, higher.id()),
        count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::item;

    fn markers(entries: &[EpisodeListEntry]) -> Vec<(String, u32)> {
        entries
            .iter()
            .filter_map(EpisodeListEntry::as_marker)
            .map(|marker| (marker.id.clone(), marker.count))
            .collect()
    }

    #[test]
    fn test_missing_count() {
        assert_eq!(missing_count(Some(3.0), 7.0), 3);
        assert_eq!(missing_count(Some(1.0), 2.0), 0);
        assert_eq!(missing_count(Some(2.5), 4.9), 1);
        assert_eq!(missing_count(None, 4.0), 3);
        assert_eq!(missing_count(None, 0.0), 0);
        assert_eq!(missing_count(Some(-1.0), 9.0), 0);
        assert_eq!(missing_count(Some(5.0), 3.0), 0);
    }

    #[test]
    fn test_ascending_gap_between_three_and_seven() {
        let entries = GapDetector::new(true).insert_markers(vec![item(1, 3.0), item(2, 7.0)]);

        assert_eq!(
            markers(&entries),
            vec![("none-1".to_string(), 2), ("1-2".to_string(), 3)]
        );
        assert!(entries[2].as_marker().is_some());
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_consecutive_numbers_have_no_marker() {
        let entries = GapDetector::new(true).insert_markers(vec![item(1, 1.0), item(2, 2.0)]);

        assert!(markers(&entries).is_empty());
    }

    #[test]
    fn test_descending_places_boundary_last() {
        let entries = GapDetector::new(false).insert_markers(vec![item(2, 7.0), item(1, 3.0)]);

        assert_eq!(
            markers(&entries),
            vec![("1-2".to_string(), 3), ("none-1".to_string(), 2)]
        );
        assert!(entries.last().and_then(EpisodeListEntry::as_marker).is_some());
    }

    #[test]
    fn test_unrecognised_numbers_break_no_gaps() {
        let entries =
            GapDetector::new(true).insert_markers(vec![item(1, -1.0), item(2, 5.0), item(3, 5.5)]);

        assert!(markers(&entries).is_empty());
    }
}
