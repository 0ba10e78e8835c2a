//! Catmull-Rom interpolation over an action list, with a one-entry cache
//! of the last bracketing index for fast sequential playback lookups.
//!
//! Grounded on `original_source/OFS-lib/Funscript/FunscriptSpline.h`.

use crate::Action;

fn catmull_rom_spline(actions: &[Action], i: i64, time: f32) -> f32 {
    let last = actions.len() as i64 - 1;
    let clamp_idx = |x: i64| x.clamp(0, last) as usize;
    let i0 = clamp_idx(i - 1);
    let i1 = clamp_idx(i);
    let i2 = clamp_idx(i + 1);
    let i3 = clamp_idx(i + 2);

    let v0 = actions[i0].pos as f32 / 100.0;
    let v1 = actions[i1].pos as f32 / 100.0;
    let v2 = actions[i2].pos as f32 / 100.0;
    let v3 = actions[i3].pos as f32 / 100.0;

    let span = actions[i2].at - actions[i1].at;
    let t = if span == 0.0 {
        0.0
    } else {
        (time - actions[i1].at) / span
    };

    catmull_rom(v0, v1, v2, v3, t)
}

/// Standard Catmull-Rom basis, matching `glm::catmullRom`.
fn catmull_rom(v0: f32, v1: f32, v2: f32, v3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * v1)
        + (-v0 + v2) * t
        + (2.0 * v0 - 5.0 * v1 + 4.0 * v2 - v3) * t2
        + (-v0 + 3.0 * v1 - 3.0 * v2 + v3) * t3)
}

/// Holds the last bracketing index so repeated forward-playing samples
/// cost an O(1) comparison instead of a binary search.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplineCache {
    idx: usize,
}

impl SplineCache {
    pub fn new() -> Self {
        Self { idx: 0 }
    }

    /// Samples the spline at `time`, returning a value in `[0.0, 1.0]`.
    /// Updates the internal cache index for the next call.
    pub fn sample(&mut self, actions: &[Action], time: f32) -> f32 {
        if actions.is_empty() {
            return 0.0;
        }
        if actions.len() == 1 {
            return actions[0].pos as f32 / 100.0;
        }
        if self.idx + 1 >= actions.len() {
            self.idx = 0;
        }

        if actions[self.idx].at <= time && actions[self.idx + 1].at >= time {
            return catmull_rom_spline(actions, self.idx as i64, time);
        }
        if self.idx + 2 < actions.len()
            && actions[self.idx + 1].at <= time
            && actions[self.idx + 2].at >= time
        {
            self.idx += 1;
            return catmull_rom_spline(actions, self.idx as i64, time);
        }

        let upper = actions.partition_point(|a| a.at <= time);
        if upper == actions.len() {
            return actions.last().unwrap().pos as f32 / 100.0;
        }
        if upper == 0 {
            return actions[0].pos as f32 / 100.0;
        }
        self.idx = upper - 1;
        catmull_rom_spline(actions, self.idx as i64, time)
    }
}

/// Stateless sample at a caller-supplied index, used when scrubbing
/// rather than playing sequentially (no cache to maintain).
pub fn sample_at_index(actions: &[Action], index: usize, time: f32) -> f32 {
    if actions.is_empty() {
        return 0.0;
    }
    if index + 1 < actions.len() && actions[index].at <= time && actions[index + 1].at >= time {
        return catmull_rom_spline(actions, index as i64, time);
    }
    actions.last().unwrap().pos as f32 / 100.0
}
