use std::collections::HashSet;

use tracing::trace;

use super::value::RowId;

/// Set of selected row ids. Insertion order is irrelevant.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SelectionTracker {
    selected: HashSet<RowId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_row(&mut self, id: RowId) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// True when every visible id is selected. An empty page is never selected.
    pub fn is_page_selected(&self, visible: &[RowId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id))
    }

    /// Selects every visible id, or clears them all when the page is already fully selected.
    /// Ids of other pages are left alone.
    pub fn toggle_page_all(&mut self, visible: &[RowId]) {
        if visible.is_empty() {
            return;
        }
        if self.is_page_selected(visible) {
            trace!("Deselecting {} rows of the page", visible.len());
            for id in visible {
                self.selected.remove(id);
            }
        } else {
            trace!("Selecting {} rows of the page", visible.len());
            self.selected.extend(visible.iter().cloned());
        }
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<i64>) -> Vec<RowId> {
        range.map(RowId::Number).collect()
    }

    #[test]
    fn toggle_row_adds_and_removes() {
        let mut sel = SelectionTracker::new();
        sel.toggle_row(RowId::from("a"));
        assert!(sel.is_selected(&RowId::from("a")));
        assert_eq!(sel.selected_count(), 1);
        sel.toggle_row(RowId::from("a"));
        assert!(!sel.is_selected(&RowId::from("a")));
        assert_eq!(sel.selected_count(), 0);
    }

    #[test]
    fn toggle_page_completes_partial_selection() {
        let mut sel = SelectionTracker::new();
        let page = ids(0..3);
        sel.toggle_row(RowId::Number(1));
        assert!(!sel.is_page_selected(&page));
        sel.toggle_page_all(&page);
        assert!(sel.is_page_selected(&page));
        assert_eq!(sel.selected_count(), 3);
    }

    #[test]
    fn toggle_page_twice_leaves_other_pages_alone() {
        let mut sel = SelectionTracker::new();
        sel.toggle_row(RowId::Number(42));
        let page = ids(0..5);
        let before = sel.clone();

        sel.toggle_page_all(&page);
        sel.toggle_page_all(&page);

        assert_eq!(sel, before);
        assert!(sel.is_selected(&RowId::Number(42)));
    }

    #[test]
    fn clear_drops_every_id() {
        let mut sel = SelectionTracker::new();
        sel.toggle_page_all(&ids(0..4));
        sel.clear();
        assert_eq!(sel.selected_count(), 0);
        assert!(!sel.is_selected(&RowId::Number(2)));
    }

    #[test]
    fn empty_page_is_never_selected() {
        let mut sel = SelectionTracker::new();
        assert!(!sel.is_page_selected(&[]));
        sel.toggle_page_all(&[]);
        assert_eq!(sel.selected_count(), 0);
    }
}
