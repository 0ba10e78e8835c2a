//! Stroke-density heatmap rendering data. Segments the action stream at
//! large gaps and direction-preserving runs, then slides a fixed-width
//! kernel over each segment to produce a `[0,1]`-normalized gradient of
//! color marks, grounded on `original_source/OFS-lib/Funscript/
//! FunscriptHeatmap.cpp`'s `UpdateHeatmapGradient`.

use ofs_action::Action;

pub const GAP_SECONDS: f32 = 10.0;
pub const KERNEL_SECONDS: f32 = 2.5;
/// `24.5 / (5 / 2.5)`, a calibration constant chosen to match the
/// reference player's heatmap output.
pub const MAX_DENSITY: f32 = 12.25;
const TRAILING_AVERAGE_SAMPLES: usize = 3;

pub type Color = [u8; 3];

const BLACK: Color = [0x00, 0x00, 0x00];
const RAMP: [Color; 6] = [
    [0x00, 0x00, 0x00],
    [0x1E, 0x90, 0xFF],
    [0x00, 0xFF, 0xFF],
    [0x00, 0xFF, 0x00],
    [0xFF, 0xFF, 0x00],
    [0xFF, 0x00, 0x00],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    /// Normalized position in `[0, 1]` of the total duration.
    pub pos: f32,
    pub color: Color,
}

/// Samples the 6-stop ramp at `t` (clamped to `[0, 1]`), linearly
/// interpolating between adjacent stops.
fn ramp_color_at(t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let segments = (RAMP.len() - 1) as f32;
    let scaled = t * segments;
    let idx = (scaled.floor() as usize).min(RAMP.len() - 2);
    let frac = scaled - idx as f32;
    let a = RAMP[idx];
    let b = RAMP[idx + 1];
    std::array::from_fn(|i| (a[i] as f32 + (b[i] as f32 - a[i] as f32) * frac).round() as u8)
}

/// Splits `actions` into runs separated by gaps `>= GAP_SECONDS`,
/// collapsing consecutive same-direction actions down to their
/// direction-change endpoints.
fn segments(actions: &[Action]) -> Vec<Vec<Action>> {
    let mut out: Vec<Vec<Action>> = Vec::new();
    let mut previous = Action::new(0.0, 0);
    let mut prev_direction = 0i32;

    for &action in actions {
        if previous.pos == action.pos {
            continue;
        }
        let direction = action.pos as i32 - previous.pos as i32;
        if (direction > 0 && prev_direction > 0) || (direction < 0 && prev_direction < 0) {
            previous = action;
            continue;
        }
        prev_direction = direction;

        if action.at - previous.at >= GAP_SECONDS {
            out.push(Vec::new());
        }
        if out.is_empty() {
            out.push(Vec::new());
        }
        out.last_mut().unwrap().push(action);
        previous = action;
    }
    out
}

/// Produces the ordered gradient marks for `actions` over a timeline of
/// `total_duration_s`. Returns an empty vec if there are no actions (the
/// caller should paint a flat black bar in that case).
pub fn marks(total_duration_s: f32, actions: &[Action]) -> Vec<Mark> {
    if actions.is_empty() || total_duration_s <= 0.0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut samples: Vec<f32> = Vec::with_capacity(TRAILING_AVERAGE_SAMPLES);

    for segment in segments(actions) {
        let Some(first) = segment.first().copied() else { continue };
        let last = segment.last().copied().unwrap();
        let duration = last.at - first.at;

        out.push(Mark { pos: first.at / total_duration_s, color: BLACK });

        let mut kernel_offset = first.at;
        loop {
            let kernel_start = kernel_offset;
            let kernel_end = kernel_offset + KERNEL_SECONDS;

            let mut count = 0u32;
            if kernel_offset < last.at {
                for action in &segment {
                    if action.at >= kernel_start && action.at <= kernel_end {
                        count += 1;
                    } else if action.at > kernel_end {
                        break;
                    }
                }
            }
            kernel_offset += KERNEL_SECONDS;

            let mut intensity = (count as f32 / MAX_DENSITY).clamp(0.0, 1.0);
            if samples.len() == TRAILING_AVERAGE_SAMPLES + 1 {
                samples.remove(0);
            }
            samples.push(intensity);
            if samples.len() > 1 {
                intensity = samples.iter().sum::<f32>() / samples.len() as f32;
            }

            out.push(Mark {
                pos: kernel_offset / total_duration_s,
                color: ramp_color_at(intensity),
            });

            if kernel_offset >= first.at + duration {
                break;
            }
        }
        out.push(Mark { pos: (kernel_offset + 1.0) / total_duration_s, color: BLACK });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_actions_produce_no_marks() {
        assert!(marks(10.0, &[]).is_empty());
    }

    #[test]
    fn scenario_6_two_segments_from_gap() {
        let actions = [
            Action::new(0.0, 0),
            Action::new(0.1, 50),
            Action::new(0.2, 100),
            Action::new(15.0, 0),
            Action::new(15.1, 50),
            Action::new(15.2, 100),
        ];
        let m = marks(20.0, &actions);
        assert!(!m.is_empty());

        let black_starts: Vec<f32> = m
            .iter()
            .filter(|mark| mark.color == BLACK)
            .map(|mark| mark.pos)
            .collect();
        // one leading black mark per segment plus a trailing black mark
        // at its end: two segments means at least four black marks.
        assert!(black_starts.len() >= 4);

        let last = m.last().unwrap();
        assert_eq!(last.color, BLACK);
        assert!((last.pos - (15.2 + 1.0) / 20.0).abs() < 1e-4);
    }

    #[test]
    fn marks_are_monotone_in_position() {
        let actions = [
            Action::new(0.0, 0),
            Action::new(1.0, 100),
            Action::new(2.0, 0),
            Action::new(3.0, 100),
        ];
        let m = marks(5.0, &actions);
        for w in m.windows(2) {
            assert!(w[1].pos >= w[0].pos);
        }
    }

    #[test]
    fn ramp_endpoints_are_exact() {
        assert_eq!(ramp_color_at(0.0), [0x00, 0x00, 0x00]);
        assert_eq!(ramp_color_at(1.0), [0xFF, 0x00, 0x00]);
    }
}
