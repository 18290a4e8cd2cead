//! Undo/redo history of annotation snapshots.
//!
//! The history is a bounded list of [`AnnotationsState`] checkpoints with a cursor
//! pointing at the one that matches the live state. Snapshots share unchanged images
//! with each other (see [`crate::store`]), so keeping fifty of them is cheap.
//!
//! Checkpoints are taken when a gesture completes, never on intermediate drag frames.

use std::collections::VecDeque;

use crate::constants::UNDO_HISTORY_SIZE;
use crate::store::AnnotationsState;

/// Configuration for the history stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of snapshots to keep
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: UNDO_HISTORY_SIZE,
        }
    }
}

/// Bounded undo/redo stack with a cursor.
///
/// - `checkpoint` drops everything after the cursor (the redo branch), appends, and
///   evicts the oldest entries beyond capacity.
/// - `undo`/`redo` move the cursor one step, clamped to the valid range.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<AnnotationsState>,
    cursor: usize,
    config: HistoryConfig,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn capacity(&self) -> usize {
        self.config.capacity.max(1)
    }

    /// Record `state` as the newest snapshot.
    pub fn checkpoint(&mut self, state: &AnnotationsState) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(state.clone());

        while self.entries.len() > self.capacity() {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        log::debug!(
            "History: checkpoint {} of {}",
            self.cursor + 1,
            self.entries.len()
        );
    }

    /// Step back one snapshot (stops at the oldest).
    pub fn undo(&mut self) -> Option<&AnnotationsState> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        log::debug!("History: undo to {}", self.cursor);
        self.entries.get(self.cursor)
    }

    /// Step forward one snapshot (stops at the newest).
    pub fn redo(&mut self) -> Option<&AnnotationsState> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1).min(self.entries.len() - 1);
        log::debug!("History: redo to {}", self.cursor);
        self.entries.get(self.cursor)
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&AnnotationsState> {
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Drop all history and start again from `state`.
    pub fn reset(&mut self, state: &AnnotationsState) {
        self.entries.clear();
        self.cursor = 0;
        self.checkpoint(state);
        log::debug!("History cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, ImageSize, Rect};
    use crate::store::AnnotationStore;

    /// A distinct state per `n`: image "img" holding `n` boxes.
    fn state(n: u64) -> AnnotationsState {
        let mut store = AnnotationStore::new();
        store.ensure_annotation("img", ImageSize::new(100, 100));
        for id in 1..=n {
            store.add_box("img", BoundingBox::new(id, Rect::new(0.0, 0.0, 10.0, 10.0)));
        }
        store.state().clone()
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let s1 = state(1);
        let s2 = state(2);
        let mut history = History::new();
        history.checkpoint(&s1);
        history.checkpoint(&s2);

        assert_eq!(history.undo(), Some(&s1));
        assert_eq!(history.redo(), Some(&s2));
    }

    #[test]
    fn test_bounds_are_clamped() {
        let mut history = History::new();
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);

        let s1 = state(1);
        history.checkpoint(&s1);
        assert_eq!(history.undo(), Some(&s1));
        assert_eq!(history.undo(), Some(&s1));
        assert_eq!(history.redo(), Some(&s1));
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_checkpoint_discards_redo_branch() {
        let mut history = History::new();
        history.checkpoint(&state(1));
        history.checkpoint(&state(2));
        history.checkpoint(&state(3));
        history.undo();
        history.undo();
        assert!(history.can_redo());

        history.checkpoint(&state(4));
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo(), Some(&state(1)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new();
        for n in 0..60 {
            history.checkpoint(&state(n));
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.cursor(), 49);
        assert_eq!(history.current(), Some(&state(59)));

        for _ in 0..100 {
            history.undo();
        }
        assert_eq!(history.current(), Some(&state(10)));
    }

    #[test]
    fn test_custom_capacity() {
        let mut history = History::with_config(HistoryConfig { capacity: 3 });
        for n in 0..5 {
            history.checkpoint(&state(n));
        }
        assert_eq!(history.len(), 3);
        assert!(history.can_undo());
    }

    #[test]
    fn test_reset() {
        let mut history = History::new();
        history.checkpoint(&state(1));
        history.checkpoint(&state(2));
        history.reset(&state(0));
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
