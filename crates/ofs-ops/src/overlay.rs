//! Time-grid overlays: quantizers that answer "where does the next/prior
//! insert snap to" for the frame grid and the tempo (beat) grid.

/// Beat-length multiples selectable by `measure_index`, grounded on the
/// original's fixed ten-entry table (`4x, 2x, 1x, 1/2 ... 1/16`).
pub const TEMPO_MULTIPLES: [f32; 10] = [
    4.0,
    2.0,
    1.0,
    1.0 / 2.0,
    1.0 / 3.0,
    1.0 / 4.0,
    1.0 / 6.0,
    1.0 / 8.0,
    1.0 / 12.0,
    1.0 / 16.0,
];

/// Guard against floating-point error landing a near-exact beat multiple
/// one bucket short, which would otherwise make `step_forward`/
/// `step_backward` appear to not move at all.
const EPS: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct FrameGrid {
    pub fps_override: Option<f32>,
    pub media_fps: f32,
}

impl FrameGrid {
    fn fps(&self) -> f32 {
        self.fps_override.unwrap_or(self.media_fps)
    }

    fn delta(&self) -> f32 {
        1.0 / self.fps()
    }

    pub fn step_forward(&self, from_t: f32) -> f32 {
        from_t + self.delta()
    }

    pub fn step_backward(&self, from_t: f32) -> f32 {
        from_t - self.delta()
    }

    /// Divider spacing for a bolder gridline, drawn every `floor(fps *
    /// 0.1)` frames.
    pub fn bold_interval(&self) -> f32 {
        (self.fps() * 0.1).floor() * self.delta()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TempoGrid {
    pub bpm: f32,
    pub beat_offset_s: f32,
    pub measure_index: usize,
}

impl TempoGrid {
    fn beat_s(&self) -> f32 {
        (60.0 / self.bpm) * TEMPO_MULTIPLES[self.measure_index.min(TEMPO_MULTIPLES.len() - 1)]
    }

    pub fn step_forward(&self, t: f32) -> f32 {
        let beat = self.beat_s();
        let x = (t - self.beat_offset_s) / beat;
        let k = (x + EPS).floor();
        k * beat + self.beat_offset_s + beat
    }

    pub fn step_backward(&self, t: f32) -> f32 {
        let beat = self.beat_s();
        let x = (t - self.beat_offset_s) / beat;
        let k = (x - EPS).ceil();
        k * beat + self.beat_offset_s - beat
    }
}

/// The two time-grid overlays, dispatched by a thin match rather than a
/// trait object since there are exactly two and neither needs dynamic
/// extension.
#[derive(Debug, Clone, Copy)]
pub enum OverlayGrid {
    Frame(FrameGrid),
    Tempo(TempoGrid),
}

impl OverlayGrid {
    pub fn step_forward(&self, t: f32) -> f32 {
        match self {
            OverlayGrid::Frame(g) => g.step_forward(t),
            OverlayGrid::Tempo(g) => g.step_forward(t),
        }
    }

    pub fn step_backward(&self, t: f32) -> f32 {
        match self {
            OverlayGrid::Frame(g) => g.step_backward(t),
            OverlayGrid::Tempo(g) => g.step_backward(t),
        }
    }
}
