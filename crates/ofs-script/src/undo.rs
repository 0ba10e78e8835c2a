use ofs_action::ActionSet;
use tracing::trace;

/// Maximum number of snapshots retained in the undo stack. Redo is
/// unbounded but is cleared whenever a non-undo edit is snapshotted.
pub const UNDO_HISTORY_MAX: usize = 1000;

/// Classifies the operation that produced a snapshot. Used by
/// `match_top` so slider-driven tools (range extend, simplify) can
/// coalesce a drag's many intermediate snapshots into one undo entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    AddAction,
    RemoveAction,
    RemoveSelection,
    EditAction,
    MoveAction,
    MoveActionToCurrentPos,
    AddEditActions,
    PasteActions,
    EqualizeActions,
    InvertActions,
    IsolateAction,
    RepeatStroke,
    CutSelection,
    GenerateActions,
    MouseMoveAction,
    TopPointsOnly,
    MidPointsOnly,
    BottomPointsOnly,
    RangeExtend,
    Simplify,
}

#[derive(Clone)]
struct Snapshot {
    tag: Tag,
    actions: ActionSet,
}

/// Per-script bounded undo/redo stacks over `ActionSet` snapshots.
pub struct UndoStack {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoStack {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Deep-copies `actions` onto the undo stack, tagged `tag`. Clears
    /// `redo` unless `clear_redo` is false (used internally by `redo()`
    /// to push the pre-redo state without wiping what it's about to
    /// restore).
    pub fn snapshot(&mut self, tag: Tag, actions: &ActionSet, clear_redo: bool) {
        self.undo.push(Snapshot {
            tag,
            actions: actions.clone(),
        });
        trace!(target: "script.undo", depth = self.undo.len(), ?tag, "snapshot");
        if self.undo.len() > UNDO_HISTORY_MAX {
            self.undo.remove(0);
            trace!(target: "script.undo", "undo_stack_trimmed");
        }
        if clear_redo {
            self.redo.clear();
        }
    }

    /// True iff the most recent undo snapshot carries `tag`.
    pub fn match_top(&self, tag: Tag) -> bool {
        self.undo.last().is_some_and(|s| s.tag == tag)
    }

    /// Pops the top undo snapshot, pushes the current state to redo,
    /// and writes the popped state into `actions`. No-op if undo is
    /// empty.
    pub fn undo(&mut self, actions: &mut ActionSet) -> bool {
        let Some(top) = self.undo.pop() else {
            return false;
        };
        self.redo.push(Snapshot {
            tag: top.tag,
            actions: actions.clone(),
        });
        *actions = top.actions;
        trace!(target: "script.undo", undo_depth = self.undo.len(), redo_depth = self.redo.len(), "undo");
        true
    }

    /// Pops the top redo snapshot, pushes the current state back onto
    /// undo (without clearing redo), and writes the popped state into
    /// `actions`. No-op if redo is empty.
    pub fn redo(&mut self, actions: &mut ActionSet) -> bool {
        let Some(top) = self.redo.pop() else {
            return false;
        };
        self.snapshot(top.tag, actions, false);
        *actions = top.actions;
        trace!(target: "script.undo", undo_depth = self.undo.len(), redo_depth = self.redo.len(), "redo");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofs_action::Action;
    use pretty_assertions::assert_eq;

    fn set(vals: &[(f32, i32)]) -> ActionSet {
        let mut s = ActionSet::new();
        for &(t, p) in vals {
            s.insert(Action::new(t, p));
        }
        s
    }

    #[test]
    fn undo_then_redo_restores_exact_state() {
        let mut stack = UndoStack::new();
        let before = set(&[(1.0, 10)]);
        stack.snapshot(Tag::AddAction, &before, true);

        let mut current = set(&[(1.0, 10), (2.0, 20)]);
        assert!(stack.undo(&mut current));
        assert_eq!(current.as_slice(), before.as_slice());

        assert!(stack.redo(&mut current));
        assert_eq!(
            current.as_slice().iter().map(|a| a.at).collect::<Vec<_>>(),
            vec![1.0, 2.0]
        );
    }

    #[test]
    fn undo_stack_caps_at_max_depth() {
        let mut stack = UndoStack::new();
        let snap = set(&[(1.0, 10)]);
        for _ in 0..(UNDO_HISTORY_MAX + 5) {
            stack.snapshot(Tag::AddAction, &snap, true);
        }
        assert_eq!(stack.undo_depth(), UNDO_HISTORY_MAX);
    }

    #[test]
    fn snapshot_clears_redo_by_default() {
        let mut stack = UndoStack::new();
        let snap = set(&[(1.0, 10)]);
        stack.snapshot(Tag::AddAction, &snap, true);
        let mut current = set(&[]);
        stack.undo(&mut current);
        assert_eq!(stack.redo_depth(), 1);

        stack.snapshot(Tag::RemoveAction, &snap, true);
        assert_eq!(stack.redo_depth(), 0);
    }

    #[test]
    fn match_top_checks_most_recent_tag() {
        let mut stack = UndoStack::new();
        let snap = set(&[]);
        assert!(!stack.match_top(Tag::RangeExtend));
        stack.snapshot(Tag::RangeExtend, &snap, true);
        assert!(stack.match_top(Tag::RangeExtend));
        assert!(!stack.match_top(Tag::Simplify));
    }

    #[test]
    fn undo_on_empty_stack_is_noop() {
        let mut stack = UndoStack::new();
        let mut current = set(&[(1.0, 0)]);
        let before = current.clone();
        assert!(!stack.undo(&mut current));
        assert_eq!(current.as_slice(), before.as_slice());
    }
}
