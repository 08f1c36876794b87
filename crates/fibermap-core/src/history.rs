// ── Undo/redo history ──
//
// Two bounded snapshot stacks. Pushing onto a full stack evicts the
// oldest entry. The history only stores snapshots; capturing and
// restoring them is the store's job.

use std::collections::VecDeque;

/// Linear undo/redo history over snapshots of type `S`.
#[derive(Debug, Clone)]
pub struct EditHistory<S> {
    undo_stack: VecDeque<S>,
    redo_stack: VecDeque<S>,
    capacity: usize,
}

impl<S> EditHistory<S> {
    /// A history keeping at most `capacity` entries per stack (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo_stack: VecDeque::with_capacity(capacity),
            redo_stack: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the state before an undoable mutation. Forward history is
    /// discarded.
    pub fn capture(&mut self, snapshot: S) {
        push_bounded(&mut self.undo_stack, snapshot, self.capacity);
        self.redo_stack.clear();
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

    /// Snapshot `undo` would restore, without consuming it.
    pub fn peek_undo(&self) -> Option<&S> {
        self.undo_stack.back()
    }

    /// Snapshot `redo` would restore, without consuming it.
    pub fn peek_redo(&self) -> Option<&S> {
        self.redo_stack.back()
    }

    /// Pop the newest undo entry and park `current` on the redo stack.
    /// `None` (and no change) when there is nothing to undo.
    pub fn pop_undo_with_current(&mut self, current: S) -> Option<S> {
        let previous = self.undo_stack.pop_back()?;
        push_bounded(&mut self.redo_stack, current, self.capacity);
        Some(previous)
    }

    /// Pop the newest redo entry and park `current` on the undo stack.
    pub fn pop_redo_with_current(&mut self, current: S) -> Option<S> {
        let next = self.redo_stack.pop_back()?;
        push_bounded(&mut self.undo_stack, current, self.capacity);
        Some(next)
    }
}

fn push_bounded<S>(stack: &mut VecDeque<S>, item: S, capacity: usize) {
    while stack.len() >= capacity {
        stack.pop_front();
    }
    stack.push_back(item);
}
