//! Audio waveform storage and its scroll-friendly level-of-detail
//! buffer, grounded on `original_source/OFS-lib/UI/OFS_Waveform.cpp`'s
//! `OFS_Waveform`/`OFS_WaveformLOD`.

/// PCM samples averaged in fixed-size blocks at load time so the full
/// in-memory buffer stays small regardless of source sample rate.
pub const SAMPLES_PER_LINE: usize = 60;

/// A flat, pre-averaged view of a mono PCM stream: each entry is the
/// average of `SAMPLES_PER_LINE` consecutive normalized PCM samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformSamples {
    pub samples: Vec<f32>,
}

impl WaveformSamples {
    /// Builds from 16-bit signed PCM, normalizing to `[-1, 1]` and
    /// averaging every `SAMPLES_PER_LINE` samples into one entry. A
    /// trailing partial block is averaged over however many samples it
    /// actually has.
    pub fn from_pcm_i16(pcm: &[i16]) -> Self {
        let mut samples = Vec::with_capacity(pcm.len() / SAMPLES_PER_LINE + 1);
        for chunk in pcm.chunks(SAMPLES_PER_LINE) {
            let sum: f32 = chunk.iter().map(|&s| s as f32 / 32768.0).sum();
            samples.push(sum / SAMPLES_PER_LINE as f32);
        }
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Parameters describing the currently visible timeline window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    pub offset_time_s: f32,
    pub visible_time_s: f32,
    pub total_duration_s: f32,
    pub canvas_width_px: f32,
}

/// A max-pooled line buffer for the visible timeline window, refreshed
/// incrementally (shift + append) when the view scrolls by a small
/// positive amount, and fully recomputed otherwise.
#[derive(Debug, Clone, Default)]
pub struct WaveformLod {
    line_buffer: Vec<f32>,
    last_canvas_x: f32,
    last_visible_duration: f32,
    last_multiple: i32,
}

impl WaveformLod {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_buffer(&self) -> &[f32] {
        &self.line_buffer
    }

    /// Recomputes (or incrementally scrolls) the line buffer for `ctx`
    /// against `samples`. Returns `true` if the buffer changed.
    pub fn update(&mut self, samples: &WaveformSamples, ctx: ViewContext) -> bool {
        if ctx.total_duration_s <= 0.0 || samples.is_empty() {
            return false;
        }
        let total = samples.len() as f32;
        let rel_start = ctx.offset_time_s / ctx.total_duration_s;
        let rel_duration = ctx.visible_time_s / ctx.total_duration_s;

        let start_f = rel_start * total;
        let end_f = start_f + total * rel_duration;
        let visible_count = end_f - start_f;

        let desired_samples = (ctx.canvas_width_px / 3.0).max(1.0);
        let every_nth = (visible_count / desired_samples).max(1.0).ceil();

        let multiple = (start_f / every_nth) as i32;
        if multiple == self.last_multiple
            && self.last_canvas_x == ctx.canvas_width_px
            && self.last_visible_duration == ctx.visible_time_s
            && !self.line_buffer.is_empty()
        {
            return false;
        }

        let scroll_by = multiple - self.last_multiple;
        let can_scroll = self.last_visible_duration == ctx.visible_time_s
            && self.last_canvas_x == ctx.canvas_width_px
            && scroll_by > 0
            && (scroll_by as usize) < self.line_buffer.len();

        if can_scroll {
            let scroll_by = scroll_by as usize;
            self.line_buffer.drain(0..scroll_by);
            let mut i = end_f - every_nth * scroll_by as f32;
            let mut added = 0usize;
            while i <= end_f && added < scroll_by {
                self.line_buffer.push(max_pool(samples, i, every_nth));
                i += every_nth;
                added += 1;
            }
        } else {
            self.line_buffer.clear();
            let mut i = start_f;
            while i <= end_f {
                self.line_buffer.push(max_pool(samples, i, every_nth));
                i += every_nth;
            }
        }

        self.last_multiple = (start_f / every_nth).floor() as i32;
        self.last_canvas_x = ctx.canvas_width_px;
        self.last_visible_duration = ctx.visible_time_s;
        true
    }
}

fn max_pool(samples: &WaveformSamples, start: f32, width: f32) -> f32 {
    let mut max_sample = 0.0f32;
    let mut j = 0.0f32;
    while j < width {
        let idx = (start + j) as i64;
        if idx >= 0 && (idx as usize) < samples.len() {
            max_sample = max_sample.max(samples.samples[idx as usize].abs());
        }
        j += 1.0;
    }
    max_sample
}
