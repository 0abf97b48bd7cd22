//! # Episode Selection
//!
//! Multi-select over the visible episode list with range ("shift-click")
//! extension.
//!
//! ## Overview
//!
//! Membership is keyed by [`EpisodeId`], so an episode hidden by a filter
//! stays selected and reappears selected. Range tracking is positional: the
//! controller remembers the lowest and highest selected index of the visible
//! list and uses them to extend a long-press selection across a span.
//!
//! ## Usage
//!
//! ```rust
//! use core_episodes::selection::{SelectionController, SelectionState};
//! use core_library::EpisodeId;
//!
//! let mut selection = SelectionController::new();
//! selection.set_visible((0..10).map(EpisodeId).collect());
//!
//! selection.toggle(2, true, true);
//! selection.toggle(7, true, true);
//! assert_eq!(selection.selected_count(), 6);
//!
//! selection.toggle(2, false, false);
//! assert_eq!(selection.range(), Some((3, 7)));
//! assert!(matches!(selection.state(), SelectionState::PartialSelection { .. }));
//! ```

use core_library::EpisodeId;
use std::collections::HashSet;
use tracing::trace;

/// Observable state of a [`SelectionController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    NoSelection,
    PartialSelection {
        selected: Vec<EpisodeId>,
        range: Option<(usize, usize)>,
    },
    AllSelected,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selected: HashSet<EpisodeId>,
    visible: Vec<EpisodeId>,
    range: Option<(usize, usize)>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the visible list.
    ///
    /// Membership is kept. The range is cleared when the order changed, since
    /// its indices would point at different episodes.
    pub fn set_visible(&mut self, ids: Vec<EpisodeId>) {
        if ids != self.visible {
            self.range = None;
        }
        self.visible = ids;
    }

    pub fn visible(&self) -> &[EpisodeId] {
        &self.visible
    }

    pub fn is_selected(&self, id: EpisodeId) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Tracked `(start, end)` range of visible indices, inclusive.
    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    /// Selected ids in visible order, followed by hidden ones by id.
    pub fn selected_ids(&self) -> Vec<EpisodeId> {
        let mut ids: Vec<EpisodeId> = self
            .visible
            .iter()
            .copied()
            .filter(|id| self.selected.contains(id))
            .collect();

        let visible: HashSet<EpisodeId> = self.visible.iter().copied().collect();
        let mut hidden: Vec<EpisodeId> = self
            .selected
            .iter()
            .copied()
            .filter(|id| !visible.contains(id))
            .collect();
        hidden.sort();

        ids.extend(hidden);
        ids
    }

    pub fn state(&self) -> SelectionState {
        if self.selected.is_empty() {
            return SelectionState::NoSelection;
        }
        if !self.visible.is_empty() && self.visible.iter().all(|id| self.selected.contains(id)) {
            return SelectionState::AllSelected;
        }
        SelectionState::PartialSelection {
            selected: self.selected_ids(),
            range: self.range,
        }
    }

    /// Sets the membership of the visible item at `index`.
    ///
    /// A long-press select extends the selection across every item between the
    /// tracked range and `index`. Returns `false` when `index` is out of bounds
    /// or the membership already matched.
    pub fn toggle(&mut self, index: usize, selected: bool, via_long_press: bool) -> bool {
        let Some(&id) = self.visible.get(index) else {
            return false;
        };
        if self.selected.contains(&id) == selected {
            return false;
        }

        if selected {
            self.select_at(index, id, via_long_press);
        } else {
            self.deselect_at(index, id);
        }
        trace!(index, selected, via_long_press, range = ?self.range, "Selection toggled");
        true
    }

    fn select_at(&mut self, index: usize, id: EpisodeId, via_long_press: bool) {
        self.selected.insert(id);

        let Some((start, end)) = self.range else {
            self.range = Some((index, index));
            return;
        };

        if via_long_press {
            let span = if index < start {
                index..start
            } else if index > end {
                end + 1..index + 1
            } else {
                index..index
            };
            for position in span {
                if let Some(&between) = self.visible.get(position) {
                    self.selected.insert(between);
                }
            }
        }
        self.range = Some((start.min(index), end.max(index)));
    }

    fn deselect_at(&mut self, index: usize, id: EpisodeId) {
        self.selected.remove(&id);

        let Some((start, end)) = self.range else {
            return;
        };
        if index != start && index != end {
            return;
        }

        // Selected items may sit outside the tracked range after invert or
        // toggle_all, so the whole visible list is scanned.
        let is_selected = |id: &EpisodeId| self.selected.contains(id);
        let first = self.visible.iter().position(is_selected);
        let last = self.visible.iter().rposition(is_selected);
        self.range = first.zip(last);
    }

    /// Selects or deselects every visible item.
    pub fn toggle_all(&mut self, selected: bool) {
        for id in &self.visible {
            if selected {
                self.selected.insert(*id);
            } else {
                self.selected.remove(id);
            }
        }
        self.range = None;
    }

    /// Flips the membership of every visible item.
    pub fn invert(&mut self) {
        for id in &self.visible {
            if !self.selected.remove(id) {
                self.selected.insert(*id);
            }
        }
        self.range = None;
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.range = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(len: i64) -> SelectionController {
        let mut selection = SelectionController::new();
        selection.set_visible((0..len).map(EpisodeId).collect());
        selection
    }

    #[test]
    fn test_long_press_range_and_boundary_deselect() {
        let mut selection = controller(10);

        assert!(selection.toggle(2, true, true));
        assert_eq!(selection.range(), Some((2, 2)));

        assert!(selection.toggle(7, true, true));
        assert_eq!(
            selection.selected_ids(),
            (2..=7).map(EpisodeId).collect::<Vec<_>>()
        );
        assert_eq!(selection.range(), Some((2, 7)));

        assert!(selection.toggle(2, false, false));
        assert_eq!(selection.range(), Some((3, 7)));
        assert_eq!(selection.selected_count(), 5);
    }

    #[test]
    fn test_long_press_below_range_extends_downward() {
        let mut selection = controller(10);
        selection.toggle(6, true, false);
        selection.toggle(3, true, true);

        assert_eq!(
            selection.selected_ids(),
            vec![EpisodeId(3), EpisodeId(4), EpisodeId(5), EpisodeId(6)]
        );
        assert_eq!(selection.range(), Some((3, 6)));
    }

    #[test]
    fn test_plain_select_widens_without_filling() {
        let mut selection = controller(10);
        selection.toggle(1, true, false);
        selection.toggle(5, true, false);

        assert_eq!(selection.selected_count(), 2);
        assert_eq!(selection.range(), Some((1, 5)));
    }

    #[test]
    fn test_interior_deselect_keeps_range() {
        let mut selection = controller(10);
        selection.toggle(2, true, true);
        selection.toggle(6, true, true);

        selection.toggle(4, false, false);

        assert_eq!(selection.range(), Some((2, 6)));
        assert!(!selection.is_selected(EpisodeId(4)));
    }

    #[test]
    fn test_deselecting_last_item_clears_range() {
        let mut selection = controller(3);
        selection.toggle(1, true, false);
        selection.toggle(1, false, false);

        assert_eq!(selection.range(), None);
        assert_eq!(selection.state(), SelectionState::NoSelection);
    }

    #[test]
    fn test_redundant_and_out_of_bounds_toggles() {
        let mut selection = controller(3);

        assert!(!selection.toggle(9, true, false));
        assert!(!selection.toggle(0, false, false));
        assert!(selection.toggle(0, true, false));
        assert!(!selection.toggle(0, true, true));
    }

    #[test]
    fn test_toggle_all_and_invert_clear_range() {
        let mut selection = controller(4);
        selection.toggle(1, true, false);

        selection.invert();
        assert_eq!(
            selection.selected_ids(),
            vec![EpisodeId(0), EpisodeId(2), EpisodeId(3)]
        );
        assert_eq!(selection.range(), None);

        selection.toggle_all(true);
        assert_eq!(selection.state(), SelectionState::AllSelected);

        selection.toggle_all(false);
        assert_eq!(selection.state(), SelectionState::NoSelection);
    }

    #[test]
    fn test_hidden_selection_survives_filtering() {
        let mut selection = controller(5);
        selection.toggle(4, true, false);
        selection.toggle(0, true, false);

        selection.set_visible(vec![EpisodeId(0), EpisodeId(1)]);
        selection.toggle_all(false);

        assert_eq!(selection.range(), None);
        assert_eq!(selection.selected_ids(), vec![EpisodeId(4)]);
        assert!(matches!(
            selection.state(),
            SelectionState::PartialSelection { range: None, .. }
        ));

        selection.set_visible((0..5).map(EpisodeId).collect());
        assert!(selection.is_selected(EpisodeId(4)));
    }

    #[test]
    fn test_boundary_deselect_after_invert_scans_whole_list() {
        let mut selection = controller(10);
        selection.toggle(0, true, false);
        selection.invert();
        selection.toggle(0, true, false);
        assert_eq!(selection.range(), Some((0, 0)));

        assert!(selection.toggle(0, false, false));

        assert_eq!(selection.selected_count(), 9);
        assert_eq!(selection.range(), Some((1, 9)));

        selection.toggle(0, true, true);
        assert_eq!(selection.range(), Some((0, 9)));
        assert_eq!(selection.state(), SelectionState::AllSelected);
    }

    #[test]
    fn test_same_visible_order_keeps_range() {
        let mut selection = controller(5);
        selection.toggle(1, true, true);
        selection.toggle(3, true, true);

        selection.set_visible((0..5).map(EpisodeId).collect());

        assert_eq!(selection.range(), Some((1, 3)));
    }
}
