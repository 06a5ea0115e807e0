//! Bounded snapshot history for undo/redo.

use crate::element::Element;

/// Upper bound on the number of snapshots kept.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Linear undo history of full element-array snapshots.
///
/// The cursor always points at a valid snapshot: the one matching the live
/// element list.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    snapshots: Vec<Vec<Element>>,
    cursor: usize,
    limit: usize,
}

impl HistoryManager {
    pub fn new(initial: Vec<Element>) -> Self {
        Self::with_limit(initial, MAX_UNDO_HISTORY)
    }

    /// History keeping at most `limit` snapshots, clamped to `1..=MAX_UNDO_HISTORY`.
    pub fn with_limit(initial: Vec<Element>, limit: usize) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            limit: limit.clamp(1, MAX_UNDO_HISTORY),
        }
    }

    /// Drop all history and start over from `initial`.
    pub fn reset(&mut self, initial: Vec<Element>) {
        self.snapshots.clear();
        self.snapshots.push(initial);
        self.cursor = 0;
    }

    /// Record the state after a mutation.
    pub fn commit(&mut self, elements: Vec<Element>) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(elements);
        self.cursor = self.snapshots.len() - 1;

        let overflow = self.snapshots.len().saturating_sub(self.limit);
        if overflow > 0 {
            self.snapshots.drain(..overflow);
            self.cursor -= overflow;
        }
    }

    /// Step back, returning the snapshot to restore.
    pub fn undo(&mut self) -> Option<&[Element]> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(&self.snapshots[self.cursor])
    }

    /// Step forward, returning the snapshot to restore.
    pub fn redo(&mut self) -> Option<&[Element]> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn current(&self) -> &[Element] {
        &self.snapshots[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
