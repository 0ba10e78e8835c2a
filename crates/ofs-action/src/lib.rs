//! Funscript action primitives.
//!
//! `Action` is the `(time, position)` sample point of a funscript track;
//! `ActionSet` is the ordered, deduplicated container that owns them plus a
//! lazily rebuilt `at -> index` lookup accelerator, mirroring the C++
//! original's `std::vector<FunscriptAction>` + `std::map<int32_t, int32_t>`
//! pairing (see `original_source/OFS-lib/Funscript/Funscript.h`).

use std::collections::HashMap;

pub mod spline;

/// A single `(time, position)` sample. `at` is seconds, never negative.
/// `pos` is clamped to `[0, 100]`. `tag` is a caller-defined annotation
/// (unused by this crate); `flags` is reserved for future use.
#[derive(Debug, Clone, Copy)]
pub struct Action {
    pub at: f32,
    pub pos: i16,
    pub flags: u8,
    pub tag: u8,
}

impl Action {
    pub fn new(at: f32, pos: i32) -> Self {
        Self {
            at,
            pos: pos.clamp(0, 100) as i16,
            flags: 0,
            tag: 0,
        }
    }

    pub fn with_tag(at: f32, pos: i32, tag: u8) -> Self {
        let mut a = Self::new(at, pos);
        a.tag = tag;
        a
    }
}

/// Equality is by `(at, pos)`, matching `FunscriptAction::operator==`.
impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.pos == other.pos
    }
}
impl Eq for Action {}

/// Ordering is by `at` only, matching `FunscriptAction::operator<`.
impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Action {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.total_cmp(&other.at)
    }
}

/// `at` values are bucketed by bit pattern for the lookup accelerator;
/// `f32` is not `Hash`/`Eq` but funscript timestamps are always produced
/// by a small set of deterministic paths (JSON ms/1000, grid snapping) so
/// bit-identical `at` is the correct notion of "same timestamp" here.
fn at_key(at: f32) -> u32 {
    at.to_bits()
}

/// The ordered, deduplicated set of actions belonging to one script (or
/// one selection). Invariants (checked by `debug_assert` at the end of
/// every mutator):
/// - actions are stored in strictly ascending `at` order
/// - no two actions share the same `at`
/// - every `pos` is in `[0, 100]`
#[derive(Debug, Clone, Default)]
pub struct ActionSet {
    actions: Vec<Action>,
    index: HashMap<u32, usize>,
    index_dirty: bool,
}

impl ActionSet {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            index: HashMap::new(),
            index_dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    fn mark_dirty(&mut self) {
        self.index_dirty = true;
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, a) in self.actions.iter().enumerate() {
            self.index.insert(at_key(a.at), i);
        }
        self.index_dirty = false;
    }

    fn ensure_index(&mut self) {
        if self.index_dirty {
            self.rebuild_index();
        }
    }

    /// Position of the first action whose `at >= t`.
    fn lower_bound_idx(&self, t: f32) -> usize {
        self.actions.partition_point(|a| a.at < t)
    }
    /// Position of the first action whose `at > t`.
    fn upper_bound_idx(&self, t: f32) -> usize {
        self.actions.partition_point(|a| a.at <= t)
    }

    /// Inserts `a`, or replaces the existing entry with the same `at`.
    /// Silently skipped if `a.at < 0`.
    pub fn insert(&mut self, a: Action) {
        if a.at < 0.0 {
            return;
        }
        let a = Action {
            pos: a.pos.clamp(0, 100),
            ..a
        };
        let idx = self.lower_bound_idx(a.at);
        if idx < self.actions.len() && self.actions[idx].at == a.at {
            self.actions[idx] = a;
        } else {
            self.actions.insert(idx, a);
        }
        self.mark_dirty();
        debug_assert!(self.is_sorted_and_unique());
    }

    /// Appends without sorting. Caller must call `sort()` before any other
    /// operation that assumes ascending order. Exists to avoid O(n^2)
    /// insertion cost when bulk-loading a parsed funscript.
    pub fn insert_unchecked_bulk(&mut self, seq: impl IntoIterator<Item = Action>) {
        self.actions.extend(seq.into_iter().filter(|a| a.at >= 0.0));
        self.mark_dirty();
    }

    /// Stable sort by `at`, deduplicating by keeping the last entry seen
    /// for any repeated timestamp (matches the JSON-load dedup rule in
    /// spec.md §6: "any duplicates on load are deduplicated by
    /// timestamp").
    pub fn sort(&mut self) {
        self.actions.sort_by(|a, b| a.at.total_cmp(&b.at));
        self.actions.dedup_by(|a, keep| {
            if a.at == keep.at {
                *keep = *a;
                true
            } else {
                false
            }
        });
        self.mark_dirty();
        debug_assert!(self.is_sorted_and_unique());
    }

    pub fn erase(&mut self, a: Action) {
        if let Some(idx) = self.find_index(a) {
            self.actions.remove(idx);
            self.mark_dirty();
        }
    }

    /// Removes all actions with `t0 <= at <= t1`.
    pub fn erase_range(&mut self, t0: f32, t1: f32) {
        if t0 > t1 {
            return;
        }
        let start = self.lower_bound_idx(t0);
        let end = self.upper_bound_idx(t1);
        if start < end {
            self.actions.drain(start..end);
            self.mark_dirty();
        }
    }

    fn find_index(&mut self, a: Action) -> Option<usize> {
        self.ensure_index();
        self.index
            .get(&at_key(a.at))
            .copied()
            .filter(|&i| self.actions[i] == a)
    }

    /// Entry equal-by-`at` (ignoring `pos`), or `None`.
    pub fn find(&mut self, a: Action) -> Option<Action> {
        self.ensure_index();
        self.index.get(&at_key(a.at)).map(|&i| self.actions[i])
    }

    /// Action with smallest `|at - t|` within `tol`, preferring the
    /// smaller error on ties (first one found scanning forward).
    pub fn closest(&self, t: f32, tol: f32) -> Option<Action> {
        if tol < 0.0 {
            return None;
        }
        let idx = self.lower_bound_idx(t);
        let mut best: Option<(f32, Action)> = None;
        for i in [idx.checked_sub(1), Some(idx)].into_iter().flatten() {
            if let Some(a) = self.actions.get(i) {
                let err = (a.at - t).abs();
                if err <= tol && best.as_ref().is_none_or(|(be, _)| err < *be) {
                    best = Some((err, *a));
                }
            }
        }
        best.map(|(_, a)| a)
    }

    pub fn next_after(&self, t: f32) -> Option<Action> {
        let idx = self.upper_bound_idx(t);
        self.actions.get(idx).copied()
    }

    pub fn prev_before(&self, t: f32) -> Option<Action> {
        let idx = self.lower_bound_idx(t);
        idx.checked_sub(1).and_then(|i| self.actions.get(i)).copied()
    }

    pub fn lower_bound(&self, t: f32) -> &[Action] {
        &self.actions[self.lower_bound_idx(t)..]
    }

    pub fn upper_bound(&self, t: f32) -> &[Action] {
        &self.actions[self.upper_bound_idx(t)..]
    }

    /// Inclusive range `[t0, t1]`, per spec.md §9's resolution of the
    /// off-by-one open question: `lower_bound(t0)` to `upper_bound(t1)`.
    pub fn range_inclusive(&self, t0: f32, t1: f32) -> &[Action] {
        let start = self.lower_bound_idx(t0);
        let end = self.upper_bound_idx(t1);
        &self.actions[start..end]
    }

    /// True if every action in `other` also exists (by `at`) in `self`.
    pub fn contains_selection(&mut self, other: &ActionSet) -> bool {
        self.ensure_index();
        other
            .actions
            .iter()
            .all(|a| self.index.contains_key(&at_key(a.at)))
    }

    /// Drops any entries whose `at` no longer names an action in `source`.
    /// Used to keep a selection `ActionSet` a true subset after `source`
    /// is edited out from under it.
    pub fn retain_existing(&mut self, source: &ActionSet) {
        let before = self.actions.len();
        self.actions.retain(|a| source.contains_at(a.at));
        if self.actions.len() != before {
            self.mark_dirty();
        }
    }

    fn contains_at(&self, at: f32) -> bool {
        let idx = self.lower_bound_idx(at);
        self.actions.get(idx).is_some_and(|found| found.at == at)
    }

    fn is_sorted_and_unique(&self) -> bool {
        self.actions.windows(2).all(|w| w[0].at < w[1].at)
            && self.actions.iter().all(|a| (0..=100).contains(&a.pos))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        let mut s = Self::new();
        s.insert_unchecked_bulk(iter);
        s.sort();
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_ordering_overwrites_on_collision() {
        // spec.md §8 scenario 1
        let mut set = ActionSet::new();
        set.insert(Action::new(1.0, 50));
        set.insert(Action::new(0.5, 10));
        set.insert(Action::new(2.0, 90));
        set.insert(Action::new(1.0, 80));

        let got: Vec<(f32, i16)> = set.iter().map(|a| (a.at, a.pos)).collect();
        assert_eq!(got, vec![(0.5, 10), (1.0, 80), (2.0, 90)]);
    }

    #[test]
    fn negative_at_is_silently_skipped() {
        let mut set = ActionSet::new();
        set.insert(Action::new(-1.0, 50));
        assert!(set.is_empty());
    }

    #[test]
    fn pos_is_clamped() {
        let mut set = ActionSet::new();
        set.insert(Action::new(1.0, 500));
        set.insert(Action::new(2.0, -500));
        assert_eq!(set.as_slice()[0].pos, 100);
        assert_eq!(set.as_slice()[1].pos, 0);
    }

    #[test]
    fn erase_range_is_inclusive() {
        let mut set = ActionSet::new();
        for (t, p) in [(0.0, 0), (1.0, 10), (2.0, 20), (3.0, 30)] {
            set.insert(Action::new(t, p));
        }
        set.erase_range(1.0, 2.0);
        let got: Vec<f32> = set.iter().map(|a| a.at).collect();
        assert_eq!(got, vec![0.0, 3.0]);
    }

    #[test]
    fn closest_prefers_smaller_error() {
        let mut set = ActionSet::new();
        set.insert(Action::new(1.0, 0));
        set.insert(Action::new(1.4, 0));
        let got = set.closest(1.2, 0.5).unwrap();
        assert_eq!(got.at, 1.4);
    }

    #[test]
    fn next_and_prev_are_strict() {
        let mut set = ActionSet::new();
        set.insert(Action::new(1.0, 0));
        set.insert(Action::new(2.0, 0));
        assert_eq!(set.next_after(1.0).unwrap().at, 2.0);
        assert_eq!(set.prev_before(2.0).unwrap().at, 1.0);
        assert!(set.next_after(2.0).is_none());
    }

    #[test]
    fn range_inclusive_includes_both_endpoints() {
        let mut set = ActionSet::new();
        for t in [0.0, 1.0, 2.0, 3.0] {
            set.insert(Action::new(t, 0));
        }
        let got: Vec<f32> = set.range_inclusive(1.0, 2.0).iter().map(|a| a.at).collect();
        assert_eq!(got, vec![1.0, 2.0]);
    }

    #[test]
    fn bulk_then_sort_dedups_last_write_wins() {
        let mut set = ActionSet::new();
        set.insert_unchecked_bulk([Action::new(1.0, 10), Action::new(1.0, 90), Action::new(0.5, 5)]);
        set.sort();
        let got: Vec<(f32, i16)> = set.iter().map(|a| (a.at, a.pos)).collect();
        assert_eq!(got, vec![(0.5, 5), (1.0, 90)]);
    }

    #[test]
    fn retain_existing_drops_stale_selection_entries() {
        let mut all = ActionSet::new();
        all.insert(Action::new(1.0, 0));
        all.insert(Action::new(2.0, 0));
        let mut selection: ActionSet = [Action::new(1.0, 0), Action::new(2.0, 0)].into_iter().collect();
        all.erase(Action::new(2.0, 0));
        selection.retain_existing(&all);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.as_slice()[0].at, 1.0);
    }
}
