//! Debounced snapshot undo/redo over the serialized surface.

use crate::clock::{Duration, Instant};
use crate::surface::Surface;
use std::collections::VecDeque;

/// Default number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 30;

/// Undo/redo stacks of serialized surfaces plus one pending commit.
///
/// `baseline` is the last committed state. A commit pushes the baseline
/// onto the undo stack and makes the current serialization the new
/// baseline, so every undo entry is a state the user can return to.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<String>,
    redo_stack: Vec<String>,
    capacity: usize,
    debounce: Duration,
    /// When the pending commit fires.
    deadline: Option<Instant>,
    baseline: String,
}

impl History {
    pub fn new(capacity: usize, debounce: Duration) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
            debounce,
            deadline: None,
            baseline: String::new(),
        }
    }

    /// Drop all history and start over from `baseline`.
    pub fn reset(&mut self, baseline: String) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.deadline = None;
        self.baseline = baseline;
    }

    /// Restart the debounce timer. Calls inside one window coalesce into a
    /// single snapshot.
    pub fn record_debounced(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Commit if the pending deadline has passed. Returns true if a new
    /// undo entry was created.
    pub fn tick(&mut self, now: Instant, surface: &Surface) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.commit(surface),
            _ => false,
        }
    }

    /// Commit a pending snapshot right away.
    pub fn flush(&mut self, surface: &Surface) -> bool {
        if self.deadline.is_some() {
            self.commit(surface)
        } else {
            false
        }
    }

    fn commit(&mut self, surface: &Surface) -> bool {
        self.deadline = None;
        let current = surface.to_markup();
        if current == self.baseline {
            return false;
        }
        let previous = std::mem::replace(&mut self.baseline, current);
        self.push_undo(previous);
        self.redo_stack.clear();
        log::debug!("History commit ({} undo states)", self.undo_stack.len());
        true
    }

    fn push_undo(&mut self, snapshot: String) {
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
    }

    /// Undo the last change.
    /// Returns true if the surface was replaced.
    pub fn undo(&mut self, surface: &mut Surface) -> bool {
        self.flush(surface);
        let Some(snapshot) = self.undo_stack.pop_back() else {
            return false;
        };
        match Surface::parse(&snapshot) {
            Ok(restored) => {
                self.redo_stack.push(surface.to_markup());
                *surface = restored;
                self.baseline = snapshot;
                true
            }
            Err(e) => {
                log::warn!("Discarding unreadable undo snapshot: {}", e);
                false
            }
        }
    }

    /// Redo the last undone change.
    /// Returns true if the surface was replaced.
    pub fn redo(&mut self, surface: &mut Surface) -> bool {
        self.flush(surface);
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        match Surface::parse(&snapshot) {
            Ok(restored) => {
                let current = surface.to_markup();
                self.push_undo(current);
                *surface = restored;
                self.baseline = snapshot;
                true
            }
            Err(e) => {
                log::warn!("Discarding unreadable redo snapshot: {}", e);
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// The most recently committed serialization.
    pub fn baseline(&self) -> &str {
        &self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::surface::Element;

    fn edit(surface: &mut Surface, n: usize) {
        let root = surface.element_roots()[0];
        surface.set_text(root, format!("edit {n}"));
    }

    fn setup() -> (Surface, History, ManualClock) {
        let surface = Surface::parse("<div>start</div>").unwrap();
        let mut history = History::new(MAX_UNDO_HISTORY, Duration::from_millis(500));
        history.reset(surface.to_markup());
        (surface, history, ManualClock::new())
    }

    #[test]
    fn test_debounce_coalesces_burst() {
        let (mut surface, mut history, clock) = setup();
        for n in 0..10 {
            edit(&mut surface, n);
            history.record_debounced(clock.now());
            clock.advance_ms(100);
            assert!(!history.tick(clock.now(), &surface));
        }
        clock.advance_ms(500);
        assert!(history.tick(clock.now(), &surface));
        assert_eq!(history.undo_len(), 1);
        assert!(!history.is_pending());
    }

    #[test]
    fn test_commit_without_change_is_noop() {
        let (surface, mut history, clock) = setup();
        history.record_debounced(clock.now());
        assert!(!history.flush(&surface));
        assert_eq!(history.undo_len(), 0);
    }

    #[test]
    fn test_undo_redo_inverse() {
        let (mut surface, mut history, clock) = setup();
        let start = surface.to_markup();
        for n in 0..3 {
            edit(&mut surface, n);
            history.record_debounced(clock.now());
            history.flush(&surface);
        }
        let end = surface.to_markup();

        for _ in 0..3 {
            assert!(history.undo(&mut surface));
        }
        assert_eq!(surface.to_markup(), start);
        assert!(!history.undo(&mut surface));

        for _ in 0..3 {
            assert!(history.redo(&mut surface));
        }
        assert_eq!(surface.to_markup(), end);
        assert!(!history.redo(&mut surface));
    }

    #[test]
    fn test_undo_flushes_pending_edit() {
        let (mut surface, mut history, clock) = setup();
        let start = surface.to_markup();
        edit(&mut surface, 1);
        history.record_debounced(clock.now());
        assert!(history.undo(&mut surface));
        assert_eq!(surface.to_markup(), start);
        assert_eq!(history.redo_len(), 1);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let (mut surface, mut history, clock) = setup();
        edit(&mut surface, 1);
        history.record_debounced(clock.now());
        history.undo(&mut surface);
        assert!(history.can_redo());

        edit(&mut surface, 2);
        history.record_debounced(clock.now());
        history.flush(&surface);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_keeps_most_recent() {
        let (mut surface, mut history, clock) = setup();
        for n in 0..40 {
            edit(&mut surface, n);
            history.record_debounced(clock.now());
            clock.advance_ms(600);
            history.tick(clock.now(), &surface);
        }
        assert_eq!(history.undo_len(), 30);

        // Oldest kept state is the one after edit 9.
        for _ in 0..30 {
            history.undo(&mut surface);
        }
        let root = surface.element_roots()[0];
        assert_eq!(surface.text_content(root), "edit 9");
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut surface, mut history, clock) = setup();
        edit(&mut surface, 1);
        history.record_debounced(clock.now());
        history.flush(&surface);
        history.reset(surface.to_markup());
        assert!(!history.can_undo());
        assert!(!history.is_pending());
        assert_eq!(history.baseline(), surface.to_markup());
    }

    #[test]
    fn test_empty_stacks_are_silent() {
        let mut surface = Surface::new();
        surface.append_element(None, Element::new("div"));
        let mut history = History::new(MAX_UNDO_HISTORY, Duration::from_millis(500));
        assert!(!history.undo(&mut surface));
        assert!(!history.redo(&mut surface));
    }
}
