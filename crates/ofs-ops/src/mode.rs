//! Scripting modes: the strategies that turn a raw `(time, pos)` insert
//! into one or more edits against a `Script`. Modeled as tagged variants
//! dispatched through a single thin trait rather than an inheritance
//! hierarchy, since each variant is owned by value and none needs
//! virtual destruction.

use ofs_action::Action;
use ofs_script::Script;

/// Shared context every strategy consults: whether playback is running
/// (which shifts inserts by `insert_delay_seconds`) and whether an
/// insert with no explicit selection should mirror across every loaded
/// script.
#[derive(Debug, Clone, Copy)]
pub struct InsertContext {
    pub playing: bool,
    pub insert_delay_seconds: f32,
    pub mirror: bool,
}

impl InsertContext {
    fn effective_time(&self, raw_time: f32) -> f32 {
        if self.playing {
            raw_time + self.insert_delay_seconds
        } else {
            raw_time
        }
    }
}

pub trait ScriptingStrategy {
    fn add_edit(&mut self, script: &mut Script, action: Action, frame_time: f32, ctx: &InsertContext);
    /// Restores any internal toggle state consumed by the edit this
    /// call pairs with, called when the editor undoes that edit.
    fn undo_hint(&mut self) {}
    fn redo_hint(&mut self) {}
    /// Advances per-frame state; only `Recording` does anything here.
    fn tick(&mut self, _dt: f32) {}
}

/// Dispatches one insert against `primary`, or against every script in
/// `scripts` when `ctx.mirror` is set. Each mirrored script gets exactly
/// one `add_edit` call, so each records exactly one undo snapshot on its
/// own stack — the "single snapshot" the mirrored edit produces.
pub fn apply_insert(
    strategy: &mut impl ScriptingStrategy,
    scripts: &mut [&mut Script],
    action: Action,
    frame_time: f32,
    ctx: &InsertContext,
) {
    if ctx.mirror {
        for script in scripts.iter_mut() {
            strategy.add_edit(script, action, frame_time, ctx);
        }
    } else if let Some(primary) = scripts.first_mut() {
        strategy.add_edit(primary, action, frame_time, ctx);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlternatingState {
    pub next_is_low: bool,
    pub context_sensitive: bool,
    pub fixed_range_enabled: bool,
    pub fixed_low: i16,
    pub fixed_high: i16,
}

#[derive(Debug, Clone, Copy)]
pub struct DynamicInjectionParams {
    /// Units per second, expected in `50.0..=500.0`.
    pub target_speed: f32,
    /// Injection point bias, expected in `-0.9..=0.9`.
    pub direction_bias: f32,
    pub direction: i8,
}

impl Default for DynamicInjectionParams {
    fn default() -> Self {
        Self {
            target_speed: 100.0,
            direction_bias: 0.0,
            direction: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingSubMode {
    Mouse,
    Controller { deadzone: u8 },
}

/// A single recorded axis sample; `x` is always present, `y` only
/// matters in two-axis mode.
#[derive(Debug, Clone, Copy)]
struct FrameSample {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone)]
pub struct RecordingState {
    pub sub_mode: RecordingSubMode,
    pub two_axes: bool,
    pub invert: bool,
    pub auto_on_play: bool,
    active: bool,
    fps: f32,
    buffer: Vec<Option<FrameSample>>,
}

impl RecordingState {
    pub fn new(sub_mode: RecordingSubMode) -> Self {
        Self {
            sub_mode,
            two_axes: false,
            invert: false,
            auto_on_play: false,
            active: false,
            fps: 30.0,
            buffer: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begins a new recording, allocating a per-frame buffer for `frame_count`
    /// video frames at `fps`.
    pub fn start(&mut self, fps: f32, frame_count: usize) {
        self.active = true;
        self.fps = fps;
        self.buffer = vec![None; frame_count];
    }

    /// Records a sample for `frame_idx`, mapped from raw device
    /// coordinates into `[-1, 1]` by the caller.
    pub fn push_sample(&mut self, frame_idx: usize, x: f32, y: f32) {
        if let Some(slot) = self.buffer.get_mut(frame_idx) {
            *slot = Some(FrameSample { x, y });
        }
    }

    fn sample_to_pos(&self, s: FrameSample, axis_y: bool) -> i16 {
        let raw = if axis_y { s.y } else { s.x };
        let normalized = (raw + 1.0) / 2.0 * 100.0;
        let v = if self.invert { 100.0 - normalized } else { normalized };
        v.clamp(0.0, 100.0).round() as i16
    }

    /// Stops recording and commits the buffer: for each frame with a
    /// valid sample, emits an action at that frame's time offset by
    /// `insert_delay`, writing into `primary` (single-axis) or into
    /// `roll`/`pitch` (two-axis).
    pub fn commit(
        &mut self,
        insert_delay: f32,
        primary: &mut Script,
        roll: Option<&mut Script>,
        pitch: Option<&mut Script>,
    ) {
        self.active = false;
        let frame_dt = 1.0 / self.fps;
        if self.two_axes {
            let (Some(roll), Some(pitch)) = (roll, pitch) else {
                return;
            };
            for (i, sample) in self.buffer.iter().enumerate() {
                if let Some(s) = sample {
                    let t = i as f32 * frame_dt + insert_delay;
                    roll.add_action(Action::new(t, self.sample_to_pos(*s, false) as i32));
                    pitch.add_action(Action::new(t, self.sample_to_pos(*s, true) as i32));
                }
            }
        } else {
            for (i, sample) in self.buffer.iter().enumerate() {
                if let Some(s) = sample {
                    let t = i as f32 * frame_dt + insert_delay;
                    primary.add_action(Action::new(t, self.sample_to_pos(*s, false) as i32));
                }
            }
        }
        self.buffer.clear();
    }
}

/// The four insertion strategies named in the component design.
#[derive(Debug, Clone)]
pub enum ScriptingMode {
    Default,
    Alternating(AlternatingState),
    DynamicInjection(DynamicInjectionParams),
    Recording(RecordingState),
}

impl ScriptingStrategy for ScriptingMode {
    fn add_edit(&mut self, script: &mut Script, action: Action, frame_time: f32, ctx: &InsertContext) {
        let t = ctx.effective_time(action.at);
        match self {
            ScriptingMode::Default => {
                script.add_edit_action(Action::new(t, action.pos as i32), frame_time);
            }
            ScriptingMode::Alternating(state) => {
                let pos = action.pos;
                let new_pos = if state.context_sensitive {
                    match script.actions().as_slice().last() {
                        Some(prev) if (prev.pos <= 50) == (pos <= 50) => 100 - pos,
                        _ => pos,
                    }
                } else if state.fixed_range_enabled {
                    let p = if state.next_is_low { state.fixed_low } else { state.fixed_high };
                    state.next_is_low = !state.next_is_low;
                    p
                } else {
                    let p = if state.next_is_low { 100 - pos } else { pos };
                    state.next_is_low = !state.next_is_low;
                    p
                };
                script.add_edit_action(Action::new(t, new_pos as i32), frame_time);
            }
            ScriptingMode::DynamicInjection(params) => {
                if let Some(prev) = script
                    .actions()
                    .prev_before(t)
                    .or_else(|| script.actions().as_slice().last().copied())
                {
                    let t_mid = prev.at + (t - prev.at) * (0.5 + 0.5 * params.direction_bias);
                    let pos_mid = (prev.pos as f32
                        + params.direction as f32 * (t_mid - prev.at) * params.target_speed)
                        .clamp(0.0, 100.0);
                    script.add_action(Action::new(t_mid, pos_mid.round() as i32));
                }
                script.add_edit_action(Action::new(t, action.pos as i32), frame_time);
            }
            ScriptingMode::Recording(_) => {
                // Recording ignores discrete inserts; samples arrive via `push_sample`.
            }
        }
    }

    fn undo_hint(&mut self) {
        if let ScriptingMode::Alternating(state) = self
            && !state.context_sensitive
        {
            state.next_is_low = !state.next_is_low;
        }
    }

    fn redo_hint(&mut self) {
        self.undo_hint();
    }

    fn tick(&mut self, _dt: f32) {}
}
