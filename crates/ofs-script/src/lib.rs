//! `Script`: one funscript track. Owns the action set, the selection
//! subset, undo/redo history, and the spline-sampling cache, and is the
//! sole mutator of all three — callers never touch `ActionSet` directly
//! once it belongs to a `Script`.

pub mod undo;

use ofs_action::spline::SplineCache;
use ofs_action::{Action, ActionSet};
use std::path::PathBuf;
use std::time::SystemTime;
use undo::{Tag, UndoStack};

/// Coalesced change notifications a `Script` accumulates between frames.
/// The owner (typically a `Project`) drains these once per frame and
/// turns them into `ofs_events::Event`s carrying the script's identity;
/// this crate has no dependency on the event bus itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingEvents {
    pub actions_changed: bool,
    pub selection_changed: bool,
}

pub struct Script {
    pub title: String,
    pub path: PathBuf,
    actions: ActionSet,
    selection: ActionSet,
    unsaved_edits: bool,
    edit_time: SystemTime,
    spline_cache: SplineCache,
    undo: UndoStack,
    pending: PendingEvents,
}

impl Script {
    pub fn new(title: impl Into<String>, path: PathBuf) -> Self {
        Self {
            title: title.into(),
            path,
            actions: ActionSet::new(),
            selection: ActionSet::new(),
            unsaved_edits: false,
            edit_time: SystemTime::now(),
            spline_cache: SplineCache::new(),
            undo: UndoStack::new(),
            pending: PendingEvents::default(),
        }
    }

    pub fn from_actions(title: impl Into<String>, path: PathBuf, actions: ActionSet) -> Self {
        let mut s = Self::new(title, path);
        s.actions = actions;
        s
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }
    pub fn selection(&self) -> &ActionSet {
        &self.selection
    }
    pub fn unsaved_edits(&self) -> bool {
        self.unsaved_edits
    }
    pub fn edit_time(&self) -> SystemTime {
        self.edit_time
    }
    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    /// Drains and returns pending change notifications, resetting them
    /// for the next frame. Call once per UI frame.
    pub fn take_events(&mut self) -> PendingEvents {
        std::mem::take(&mut self.pending)
    }

    pub fn clear_unsaved_edits(&mut self) {
        self.unsaved_edits = false;
    }

    fn touch(&mut self) {
        self.unsaved_edits = true;
        self.edit_time = SystemTime::now();
        self.pending.actions_changed = true;
    }

    fn touch_selection(&mut self) {
        self.pending.selection_changed = true;
    }

    /// Drops selection entries whose `at` no longer names an action,
    /// firing `SelectionChanged` if anything was dropped.
    fn prune_selection(&mut self) {
        let before = self.selection.len();
        self.selection.retain_existing(&self.actions);
        if self.selection.len() != before {
            self.touch_selection();
        }
    }

    // ---- piecewise-linear / spline sampling --------------------------------

    /// Piecewise-linear interpolation between the two actions bracketing
    /// `t_s`, clamped to the endpoints outside the action range.
    pub fn position_at(&self, t_s: f32) -> f32 {
        let acts = self.actions.as_slice();
        if acts.is_empty() {
            return 0.0;
        }
        if t_s <= acts[0].at {
            return acts[0].pos as f32;
        }
        if t_s >= acts[acts.len() - 1].at {
            return acts[acts.len() - 1].pos as f32;
        }
        let idx = acts.partition_point(|a| a.at <= t_s);
        let prev = acts[idx - 1];
        let next = acts[idx];
        let span = next.at - prev.at;
        if span <= 0.0 {
            return prev.pos as f32;
        }
        let frac = (t_s - prev.at) / span;
        prev.pos as f32 + frac * (next.pos - prev.pos) as f32
    }

    /// Catmull-Rom sample in `[0.0, 1.0]`, using the one-entry cache of
    /// the last bracketing index for O(1) scans during playback.
    pub fn spline(&mut self, t_s: f32) -> f32 {
        self.spline_cache.sample(self.actions.as_slice(), t_s)
    }

    /// Slices the `[start_s, end_s]` range for a clip export: the
    /// actions in range plus an interpolated boundary action at each
    /// endpoint, shifted so the clip starts at time zero.
    pub fn clip_slice(&self, start_s: f32, end_s: f32) -> ActionSet {
        let mut slice = ActionSet::new();
        slice.insert_unchecked_bulk(self.actions.range_inclusive(start_s, end_s).iter().copied());
        slice.insert(Action::new(start_s, self.position_at(start_s).round() as i32));
        slice.insert(Action::new(end_s, self.position_at(end_s).round() as i32));
        slice.sort();

        let mut out = ActionSet::new();
        out.insert_unchecked_bulk(slice.iter().map(|a| Action::new(a.at - start_s, a.pos as i32)));
        out.sort();
        out
    }

    // ---- mutation -----------------------------------------------------------

    pub fn add_action(&mut self, a: Action) {
        self.undo.snapshot(Tag::AddAction, &self.actions, true);
        self.actions.insert(a);
        self.touch();
    }

    /// Overwrites the nearest existing action within `frame_time / 2` of
    /// `a.at` (moving its position only, keeping its original
    /// timestamp); otherwise inserts `a` as a new action.
    pub fn add_edit_action(&mut self, a: Action, frame_time: f32) {
        self.undo.snapshot(Tag::AddEditActions, &self.actions, true);
        match self.actions.closest(a.at, frame_time / 2.0) {
            Some(existing) => {
                self.actions.insert(Action { pos: a.pos, ..existing });
            }
            None => {
                self.actions.insert(a);
            }
        }
        self.touch();
    }

    /// Finds `old` by exact `(at, pos)` match, replaces it with `new`,
    /// and drops any selection entry that no longer resolves.
    pub fn edit_action(&mut self, old: Action, new: Action) -> bool {
        if self.actions.find(old) != Some(old) {
            return false;
        }
        self.undo.snapshot(Tag::EditAction, &self.actions, true);
        self.actions.erase(old);
        self.actions.insert(new);
        self.touch();
        self.prune_selection();
        true
    }

    pub fn add_range(&mut self, range: impl IntoIterator<Item = Action>, dedup: bool) {
        self.undo.snapshot(Tag::AddEditActions, &self.actions, true);
        if dedup {
            for a in range {
                self.actions.insert(a);
            }
        } else {
            self.actions.insert_unchecked_bulk(range);
            self.actions.sort();
        }
        self.touch();
    }

    pub fn remove_range_time(&mut self, t0: f32, t1: f32) {
        self.undo.snapshot(Tag::RemoveAction, &self.actions, true);
        self.actions.erase_range(t0, t1);
        self.touch();
        self.prune_selection();
    }

    pub fn remove_selected(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.undo.snapshot(Tag::RemoveSelection, &self.actions, true);
        for a in self.selection.as_slice().to_vec() {
            self.actions.erase(a);
        }
        self.selection = ActionSet::new();
        self.touch();
        self.touch_selection();
    }

    pub fn remove_actions(&mut self, set: &ActionSet) {
        self.undo.snapshot(Tag::RemoveAction, &self.actions, true);
        for a in set.as_slice() {
            self.actions.erase(*a);
        }
        self.touch();
        self.prune_selection();
    }

    // ---- selection ------------------------------------------------------------

    pub fn select_all(&mut self) {
        self.selection = self.actions.iter().copied().collect();
        self.touch_selection();
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection = ActionSet::new();
            self.touch_selection();
        }
    }

    pub fn toggle(&mut self, a: Action) {
        if let Some(found) = self.actions.find(a) {
            if self.selection.find(found).is_some() {
                self.selection.erase(found);
            } else {
                self.selection.insert(found);
            }
            self.touch_selection();
        }
    }

    pub fn set_selected(&mut self, a: Action, flag: bool) {
        let Some(found) = self.actions.find(a) else {
            return;
        };
        if flag {
            self.selection.insert(found);
        } else {
            self.selection.erase(found);
        }
        self.touch_selection();
    }

    pub fn select_time(&mut self, t0: f32, t1: f32, clear: bool) {
        if clear {
            self.selection = ActionSet::new();
        }
        for a in self.actions.range_inclusive(t0, t1) {
            self.selection.insert(*a);
        }
        self.touch_selection();
    }

    /// For each interior triple of the current selection (in time
    /// order), deselects the two with the lowest `pos`, leaving local
    /// maxima selected.
    pub fn select_top(&mut self) {
        self.pick_extrema(true);
    }

    /// Symmetric to `select_top`: leaves local minima selected.
    pub fn select_bottom(&mut self) {
        self.pick_extrema(false);
    }

    /// `selection - top_set - bottom_set`.
    pub fn select_mid(&mut self) {
        let sel: Vec<Action> = self.selection.iter().copied().collect();
        if sel.len() < 3 {
            self.selection = ActionSet::new();
            self.touch_selection();
            return;
        }
        let mut keep = vec![true; sel.len()];
        keep[0] = false;
        keep[sel.len() - 1] = false;
        for i in 1..sel.len() - 1 {
            let (prev, cur, next) = (sel[i - 1], sel[i], sel[i + 1]);
            if (cur.pos >= prev.pos && cur.pos >= next.pos)
                || (cur.pos <= prev.pos && cur.pos <= next.pos)
            {
                keep[i] = false;
            }
        }
        self.selection = sel
            .into_iter()
            .zip(keep)
            .filter_map(|(a, k)| k.then_some(a))
            .collect();
        self.touch_selection();
    }

    fn pick_extrema(&mut self, top: bool) {
        let sel: Vec<Action> = self.selection.iter().copied().collect();
        if sel.len() < 3 {
            self.touch_selection();
            return;
        }
        let mut keep = vec![true; sel.len()];
        for i in 1..sel.len() - 1 {
            let (prev, cur, next) = (sel[i - 1], sel[i], sel[i + 1]);
            let is_extremum = if top {
                cur.pos >= prev.pos && cur.pos >= next.pos
            } else {
                cur.pos <= prev.pos && cur.pos <= next.pos
            };
            if !is_extremum {
                keep[i] = false;
            }
        }
        self.selection = sel
            .into_iter()
            .zip(keep)
            .filter_map(|(a, k)| k.then_some(a))
            .collect();
        self.touch_selection();
    }

    /// Rescales each half-stroke of the current selection so its
    /// extrema move outward by `extension`, preserving interior points'
    /// relative position within the stroke.
    pub fn range_extend(&mut self, extension: f32) {
        if !self.undo.match_top(Tag::RangeExtend) {
            self.undo.snapshot(Tag::RangeExtend, &self.actions, true);
        }
        let sel: Vec<Action> = self.selection.iter().copied().collect();
        for (lo, hi) in strokes(&sel) {
            let stroke = &sel[lo..=hi];
            let (min_pos, max_pos) = stroke
                .iter()
                .fold((i16::MAX, i16::MIN), |(mn, mx), a| (mn.min(a.pos), mx.max(a.pos)));
            if min_pos == max_pos {
                continue;
            }
            let new_lo = (min_pos as f32 - extension).clamp(0.0, 100.0);
            let new_hi = (max_pos as f32 + extension).clamp(0.0, 100.0);
            for a in stroke {
                let frac = (a.pos - min_pos) as f32 / (max_pos - min_pos) as f32;
                let new_pos = (frac * (new_hi - new_lo) + new_lo).clamp(0.0, 100.0);
                let edited = Action {
                    pos: new_pos.round() as i16,
                    ..*a
                };
                self.actions.insert(edited);
                self.selection.insert(edited);
            }
        }
        self.touch();
        self.touch_selection();
    }

    /// Keeps endpoint timestamps; redistributes interior timestamps of
    /// the current selection uniformly. Positions are unchanged.
    pub fn equalize(&mut self) {
        let sel: Vec<Action> = self.selection.iter().copied().collect();
        if sel.len() < 3 {
            return;
        }
        self.undo.snapshot(Tag::EqualizeActions, &self.actions, true);
        let first_at = sel[0].at;
        let last_at = sel[sel.len() - 1].at;
        let step = (last_at - first_at) / (sel.len() - 1) as f32;
        let mut new_selection = ActionSet::new();
        for (i, a) in sel.iter().enumerate() {
            let new_at = first_at + step * i as f32;
            self.actions.erase(*a);
            let edited = Action { at: new_at, ..*a };
            self.actions.insert(edited);
            new_selection.insert(edited);
        }
        self.selection = new_selection;
        self.touch();
        self.touch_selection();
    }

    /// `pos' = 100 - pos` for each selected action; timestamps unchanged.
    pub fn invert(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.undo.snapshot(Tag::InvertActions, &self.actions, true);
        let sel: Vec<Action> = self.selection.iter().copied().collect();
        let mut new_selection = ActionSet::new();
        for a in sel {
            let edited = Action::new(a.at, 100 - a.pos as i32);
            self.actions.insert(edited);
            new_selection.insert(edited);
        }
        self.selection = new_selection;
        self.touch();
        self.touch_selection();
    }

    /// Shifts every selected action's timestamp by `offset`, clamping so
    /// the extremal moving action does not cross an unselected
    /// neighbor within `frame_time`.
    pub fn move_time(&mut self, offset: f32, frame_time: f32) {
        let sel: Vec<Action> = self.selection.iter().copied().collect();
        if sel.is_empty() || offset == 0.0 {
            return;
        }
        if !self.undo.match_top(Tag::MoveAction) {
            self.undo.snapshot(Tag::MoveAction, &self.actions, true);
        }
        let min_at = sel[0].at;
        let max_at = sel[sel.len() - 1].at;
        let clamped = if offset > 0.0 {
            match self.actions.next_after(max_at) {
                Some(neighbor) => offset.min((neighbor.at - frame_time - max_at).max(0.0)),
                None => offset,
            }
        } else {
            match self.actions.prev_before(min_at) {
                Some(neighbor) => offset.max((neighbor.at + frame_time - min_at).min(0.0)),
                None => offset,
            }
        };
        let mut new_selection = ActionSet::new();
        for a in sel {
            self.actions.erase(a);
            let new_at = (a.at + clamped).max(0.0);
            let edited = Action { at: new_at, ..a };
            self.actions.insert(edited);
            new_selection.insert(edited);
        }
        self.selection = new_selection;
        self.touch();
        self.touch_selection();
    }

    /// Finds the stroke ending at or before `playhead`, then appends a
    /// copy of it after `playhead`, preserving intra-stroke timing.
    pub fn repeat_stroke(&mut self, playhead: f32) {
        let acts: Vec<Action> = self.actions.iter().copied().collect();
        let extrema = stroke_extrema(&acts);
        let segs: Vec<(usize, usize)> = extrema.windows(2).map(|w| (w[0], w[1])).collect();
        let Some(&(lo, hi)) = segs.iter().rev().find(|&&(_, e)| acts[e].at <= playhead) else {
            return;
        };
        self.undo.snapshot(Tag::RepeatStroke, &self.actions, true);
        let stroke_start = acts[lo].at;
        for idx in lo..=hi {
            let offset = acts[idx].at - stroke_start;
            let new_at = playhead + offset;
            self.actions.insert(Action::new(new_at, acts[idx].pos as i32));
        }
        self.touch();
    }

    /// Removes the time-neighbors of the action closest to `playhead`,
    /// leaving it isolated. No-op if there is no action near `playhead`
    /// or it already has no neighbors.
    pub fn isolate(&mut self, playhead: f32) {
        let Some(closest) = self.actions.closest(playhead, f32::INFINITY) else {
            return;
        };
        let prev = self.actions.prev_before(closest.at);
        let next = self.actions.next_after(closest.at);
        if prev.is_none() && next.is_none() {
            return;
        }
        self.undo.snapshot(Tag::IsolateAction, &self.actions, true);
        if let Some(p) = prev {
            self.actions.erase(p);
        }
        if let Some(n) = next {
            self.actions.erase(n);
        }
        self.touch();
        self.prune_selection();
    }
}

/// Indices of local extrema (direction-change points) over `acts`,
/// always including the first and last index. Runs of equal `pos` do
/// not themselves introduce a boundary.
fn stroke_extrema(acts: &[Action]) -> Vec<usize> {
    if acts.len() < 2 {
        return (0..acts.len()).collect();
    }
    let mut extrema = vec![0];
    let mut dir = 0i32;
    for i in 1..acts.len() {
        let delta = acts[i].pos as i32 - acts[i - 1].pos as i32;
        if delta == 0 {
            continue;
        }
        let d = delta.signum();
        if dir == 0 {
            dir = d;
        } else if d != dir {
            extrema.push(i - 1);
            dir = d;
        }
    }
    extrema.push(acts.len() - 1);
    extrema
}

/// Stroke boundaries (inclusive index ranges) over an arbitrary action
/// slice, used by `range_extend` over the selection rather than the
/// full action set.
fn strokes(acts: &[Action]) -> Vec<(usize, usize)> {
    stroke_extrema(acts).windows(2).map(|w| (w[0], w[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn script() -> Script {
        Script::new("test", PathBuf::from("test.funscript"))
    }

    fn positions(s: &Script) -> Vec<(f32, i16)> {
        s.actions().iter().map(|a| (a.at, a.pos)).collect()
    }

    #[test]
    fn scenario_1_insert_ordering() {
        let mut s = script();
        s.add_action(Action::new(1.0, 50));
        s.add_action(Action::new(0.5, 10));
        s.add_action(Action::new(2.0, 90));
        s.add_action(Action::new(1.0, 80));
        assert_eq!(positions(&s), vec![(0.5, 10), (1.0, 80), (2.0, 90)]);
    }

    #[test]
    fn scenario_2_selection_move_with_snap() {
        let mut s = script();
        for (t, p) in [(1.0, 0), (2.0, 100), (3.0, 0)] {
            s.add_action(Action::new(t, p));
        }
        s.select_all();
        s.move_time(0.5, 0.04);
        assert_eq!(positions(&s), vec![(1.5, 0), (2.5, 100), (3.5, 0)]);

        s.add_action(Action::new(3.6, 50));
        s.select_time(0.0, 3.5, true);
        s.move_time(0.2, 0.04);

        let got = positions(&s);
        assert!(got.contains(&(1.56, 0)));
        assert!(got.contains(&(2.56, 100)));
        assert!(got.contains(&(3.56, 0)));
        assert!(got.contains(&(3.6, 50)));
    }

    #[test]
    fn invert_is_involutive() {
        let mut s = script();
        s.add_action(Action::new(1.0, 20));
        s.add_action(Action::new(2.0, 80));
        s.select_all();
        s.invert();
        s.invert();
        assert_eq!(positions(&s), vec![(1.0, 20), (2.0, 80)]);
    }

    #[test]
    fn equalize_preserves_endpoints_and_spaces_evenly() {
        let mut s = script();
        s.add_action(Action::new(0.0, 0));
        s.add_action(Action::new(0.3, 50));
        s.add_action(Action::new(2.0, 100));
        s.select_all();
        s.equalize();
        let ats: Vec<f32> = s.actions().iter().map(|a| a.at).collect();
        assert_eq!(ats, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn undo_redo_round_trips_add_action() {
        let mut s = script();
        s.add_action(Action::new(1.0, 10));
        s.add_action(Action::new(2.0, 20));
        assert_eq!(s.actions().len(), 2);

        assert!(s.undo.undo(&mut s.actions));
        assert_eq!(s.actions().len(), 1);

        assert!(s.undo.redo(&mut s.actions));
        assert_eq!(s.actions().len(), 2);
    }

    #[test]
    fn selection_is_pruned_when_action_removed() {
        let mut s = script();
        s.add_action(Action::new(1.0, 0));
        s.add_action(Action::new(2.0, 0));
        s.select_all();
        assert_eq!(s.selection().len(), 2);
        s.remove_range_time(2.0, 2.0);
        assert_eq!(s.selection().len(), 1);
    }

    #[test]
    fn select_top_keeps_local_maxima() {
        let mut s = script();
        for (t, p) in [(0.0, 0), (1.0, 100), (2.0, 0), (3.0, 100), (4.0, 0)] {
            s.add_action(Action::new(t, p));
        }
        s.select_all();
        s.select_top();
        let ats: Vec<f32> = s.selection().iter().map(|a| a.at).collect();
        assert_eq!(ats, vec![1.0, 3.0]);
    }

    #[test]
    fn isolate_removes_both_neighbors_of_closest_action() {
        let mut s = script();
        s.add_action(Action::new(1.0, 0));
        s.add_action(Action::new(2.0, 50));
        s.add_action(Action::new(3.0, 100));
        s.isolate(2.1);
        assert_eq!(positions(&s), vec![(2.0, 50)]);
    }

    #[test]
    fn isolate_removes_only_existing_neighbor_at_an_edge() {
        let mut s = script();
        s.add_action(Action::new(1.0, 0));
        s.add_action(Action::new(2.0, 50));
        s.isolate(1.0);
        assert_eq!(positions(&s), vec![(2.0, 50)]);
    }

    #[test]
    fn clip_slice_adds_interpolated_boundaries_and_shifts_to_zero() {
        let mut s = script();
        s.add_action(Action::new(1.0, 0));
        s.add_action(Action::new(3.0, 100));
        let clip = s.clip_slice(1.5, 2.5);
        let got: Vec<(f32, i16)> = clip.iter().map(|a| (a.at, a.pos)).collect();
        assert_eq!(got, vec![(0.0, 25), (1.0, 75)]);
    }

    #[test]
    fn isolate_is_a_no_op_with_no_neighbors() {
        let mut s = script();
        s.add_action(Action::new(1.0, 0));
        s.isolate(1.0);
        assert_eq!(positions(&s), vec![(1.0, 0)]);
    }
}
