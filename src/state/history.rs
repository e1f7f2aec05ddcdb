//! Snapshot-based undo/redo history.
//!
//! - Undo/redo stacks of full snapshots
//! - A fixed maximum depth; the oldest entry is dropped first
//! - Batch grouping so a drag gesture becomes one undo step

/// A single entry in the undo/redo history.
#[derive(Clone, Debug)]
pub struct HistoryEntry<S> {
    /// Human-readable label describing the action (e.g. "Split clip").
    pub label: String,
    /// The state snapshot at this point in history.
    pub snapshot: S,
}

#[derive(Clone, Debug)]
struct Batch<S> {
    label: String,
    before: S,
}

/// Bounded undo/redo stacks.
///
/// Callers push the state *before* each mutation. Pushing clears the redo
/// stack. Undo and redo take the current state so it can be moved to the
/// opposite stack.
#[derive(Clone, Debug)]
pub struct HistoryStack<S> {
    undo_stack: Vec<HistoryEntry<S>>,
    redo_stack: Vec<HistoryEntry<S>>,
    max_entries: usize,
    batch: Option<Batch<S>>,
}

impl<S: Clone + PartialEq> HistoryStack<S> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
            batch: None,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    /// Label of the entry the next undo would restore.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|entry| entry.label.as_str())
    }

    /// Record the state before a mutation. Suppressed while a batch is open.
    pub fn push(&mut self, label: &str, snapshot: S) {
        if self.batch.is_some() {
            tracing::debug!(label, "Push suppressed: batch in progress");
            return;
        }
        self.redo_stack.clear();
        self.push_undo(HistoryEntry {
            label: label.to_string(),
            snapshot,
        });
        tracing::debug!(label, undo_depth = self.undo_stack.len(), "History entry pushed");
    }

    fn push_undo(&mut self, entry: HistoryEntry<S>) {
        self.undo_stack.push(entry);
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Step back. Returns the snapshot to restore, or `None` past the bottom.
    pub fn undo(&mut self, current: S) -> Option<S> {
        if self.batch.take().is_some() {
            tracing::warn!("Ending stuck batch before undo");
        }
        let entry = self.undo_stack.pop()?;
        tracing::debug!(label = %entry.label, undo_remaining = self.undo_stack.len(), "Undo");
        self.redo_stack.push(HistoryEntry {
            label: entry.label,
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Step forward again. Returns the snapshot to restore, or `None` when
    /// nothing was undone.
    pub fn redo(&mut self, current: S) -> Option<S> {
        if self.batch.take().is_some() {
            tracing::warn!("Ending stuck batch before redo");
        }
        let entry = self.redo_stack.pop()?;
        tracing::debug!(label = %entry.label, redo_remaining = self.redo_stack.len(), "Redo");
        self.push_undo(HistoryEntry {
            label: entry.label,
            snapshot: current,
        });
        Some(entry.snapshot)
    }

    /// Open a batch: `before` becomes the single entry recorded on `end_batch`.
    /// A second begin while a batch is open is ignored.
    pub fn begin_batch(&mut self, label: &str, before: S) {
        if self.batch.is_some() {
            tracing::debug!(label, "Batch already open");
            return;
        }
        self.batch = Some(Batch {
            label: label.to_string(),
            before,
        });
    }

    /// Close the batch. Records one entry if `current` differs from the state
    /// captured at `begin_batch`. Returns whether an entry was recorded.
    pub fn end_batch(&mut self, current: &S) -> bool {
        let Some(batch) = self.batch.take() else {
            return false;
        };
        if &batch.before == current {
            tracing::debug!(label = %batch.label, "Batch ended without changes");
            return false;
        }
        self.push(&batch.label, batch.before);
        true
    }

    /// Drop an open batch without recording anything.
    pub fn cancel_batch(&mut self) {
        self.batch = None;
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = HistoryStack::new(20);
        let mut state = vec![1];
        history.push("add", state.clone());
        state.push(2);

        let restored = history.undo(state.clone()).unwrap();
        assert_eq!(restored, vec![1]);
        let redone = history.redo(restored).unwrap();
        assert_eq!(redone, state);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_past_bounds_is_noop() {
        let mut history: HistoryStack<u32> = HistoryStack::new(20);
        assert_eq!(history.undo(5), None);
        assert_eq!(history.redo(5), None);
        assert_eq!(history.undo_depth(), 0);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn test_history_bound() {
        let mut history = HistoryStack::new(20);
        for step in 0..25u32 {
            history.push("edit", step);
        }
        assert_eq!(history.undo_depth(), 20);

        let mut current = 25;
        let mut undone = 0;
        while let Some(previous) = history.undo(current) {
            current = previous;
            undone += 1;
        }
        assert_eq!(undone, 20);
        // Oldest five snapshots were dropped.
        assert_eq!(current, 5);
    }

    #[test]
    fn test_new_push_clears_redo() {
        let mut history = HistoryStack::new(20);
        history.push("a", 0);
        let restored = history.undo(1).unwrap();
        assert!(history.can_redo());
        history.push("b", restored);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_batch_records_single_entry() {
        let mut history = HistoryStack::new(20);
        history.begin_batch("drag", 0);
        history.push("move", 1);
        history.push("move", 2);
        assert_eq!(history.undo_depth(), 0);
        assert!(history.end_batch(&3));
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.undo_label(), Some("drag"));
        assert_eq!(history.undo(3), Some(0));
    }

    #[test]
    fn test_batch_without_change_records_nothing() {
        let mut history = HistoryStack::new(20);
        history.begin_batch("drag", 7);
        assert!(!history.end_batch(&7));
        assert!(!history.can_undo());
        assert!(!history.end_batch(&7));
    }
}
