//! # Undo/Redo Stack
//!
//! Committed documents are whole strings, so history is a pair of bounded
//! snapshot deques. Undo trades the current document for the newest past
//! snapshot; redo trades it back. Recording a new commit forgets the future.

use std::collections::VecDeque;

/// A committed document and the mutation kind that replaced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub document: String,
    pub kind: &'static str,
}

#[derive(Debug)]
pub struct UndoStack {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
    /// 0 keeps everything
    limit: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_max_levels(100)
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_levels(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// Remember `before`, the document a `kind` mutation just replaced
    pub fn record(&mut self, before: String, kind: &'static str) {
        self.future.clear();
        self.past.push_back(Snapshot {
            document: before,
            kind,
        });
        while self.limit > 0 && self.past.len() > self.limit {
            self.past.pop_front();
        }
    }

    /// Swap `current` for the newest past document
    pub fn undo(&mut self, current: String) -> Option<String> {
        let Snapshot { document, kind } = self.past.pop_back()?;
        self.future.push(Snapshot {
            document: current,
            kind,
        });
        Some(document)
    }

    /// Swap `current` for the most recently undone document
    pub fn redo(&mut self, current: String) -> Option<String> {
        let Snapshot { document, kind } = self.future.pop()?;
        self.past.push_back(Snapshot {
            document: current,
            kind,
        });
        Some(document)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// (undo, redo) depths
    pub fn depth(&self) -> (usize, usize) {
        (self.past.len(), self.future.len())
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Mutation kind the next undo would revert
    pub fn next_undo(&self) -> Option<&'static str> {
        self.past.back().map(|s| s.kind)
    }

    /// Mutation kind the next redo would reapply
    pub fn next_redo(&self) -> Option<&'static str> {
        self.future.last().map(|s| s.kind)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(n: usize) -> String {
        format!("<div class=\"mc-root\">{}</div>", n)
    }

    #[test]
    fn test_walks_back_and_forth() {
        let mut history = UndoStack::new();
        history.record(doc(0), "inject");
        history.record(doc(1), "set-text");
        assert_eq!(history.depth(), (2, 0));
        assert_eq!(history.next_undo(), Some("set-text"));

        assert_eq!(history.undo(doc(2)), Some(doc(1)));
        assert_eq!(history.undo(doc(1)), Some(doc(0)));
        assert_eq!(history.undo(doc(0)), None);
        assert_eq!(history.next_redo(), Some("inject"));

        assert_eq!(history.redo(doc(0)), Some(doc(1)));
        assert_eq!(history.redo(doc(1)), Some(doc(2)));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_commit_forgets_future() {
        let mut history = UndoStack::new();
        history.record(doc(0), "inject");
        history.undo(doc(1));
        assert!(history.can_redo());

        history.record(doc(0), "remove");
        assert_eq!(history.depth(), (1, 0));
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = UndoStack::with_max_levels(2);
        for n in 0..5 {
            history.record(doc(n), "move");
        }
        assert_eq!(history.depth(), (2, 0));
        assert_eq!(history.undo(doc(5)), Some(doc(4)));
        assert_eq!(history.undo(doc(4)), Some(doc(3)));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_unlimited() {
        let mut history = UndoStack::with_max_levels(0);
        for n in 0..250 {
            history.record(doc(n), "duplicate");
        }
        assert_eq!(history.depth(), (250, 0));
        assert_eq!(history.limit(), 0);

        history.clear();
        assert!(!history.can_undo());
    }
}
