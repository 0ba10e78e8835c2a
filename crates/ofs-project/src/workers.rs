//! Background workers that perform file I/O without blocking the UI
//! thread: the project save worker and the per-clip video slicer. Both
//! post their completion back through the event bus rather than
//! mutating project state directly.

use ofs_events::Event;
use std::path::PathBuf;
use tokio::sync::mpsc::Sender;

/// Writes `bytes` to `path` on a blocking-task thread, then posts
/// `SaveCompleted`/`SaveFailed`. The caller serializes the project into
/// `bytes` on the UI thread before calling this so the write itself
/// never touches live project state.
pub async fn save_worker(script_id: usize, path: PathBuf, bytes: Vec<u8>, events: Sender<Event>) {
    let result = tokio::task::spawn_blocking(move || std::fs::write(&path, &bytes)).await;
    let event = match result {
        Ok(Ok(())) => Event::SaveCompleted { script_id },
        Ok(Err(e)) => Event::SaveFailed { message: e.to_string() },
        Err(e) => Event::SaveFailed { message: e.to_string() },
    };
    if events.send(event).await.is_err() {
        tracing::warn!(target: "project.save", "event channel closed before save completion delivered");
    }
}

/// One clip specification for the exporter: a `[start, end]` time range
/// in seconds sliced from `media_path` into `output_path`.
pub struct ClipSpec {
    pub media_path: PathBuf,
    pub output_path: PathBuf,
    pub start_s: f32,
    pub end_s: f32,
}

/// Spawns one slicing subprocess per clip, reporting progress after
/// each completes. Errors in a single clip are logged and do not abort
/// the remaining clips, per the batch-export contract.
pub async fn export_clips(clips: Vec<ClipSpec>, events: Sender<Event>) {
    let total = clips.len();
    for (done, clip) in clips.into_iter().enumerate() {
        let duration = (clip.end_s - clip.start_s).max(0.0);
        let result = tokio::process::Command::new("ffmpeg")
            .arg("-ss")
            .arg(clip.start_s.to_string())
            .arg("-i")
            .arg(&clip.media_path)
            .arg("-t")
            .arg(duration.to_string())
            .arg(&clip.output_path)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                tracing::error!(
                    target: "project.clip_export",
                    path = %clip.output_path.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "clip export failed"
                );
            }
            Err(e) => {
                tracing::error!(target: "project.clip_export", path = %clip.output_path.display(), error = %e, "failed to spawn slicer");
            }
        }

        let _ = events
            .send(Event::ClipExportProgress { done: done + 1, total })
            .await;
    }
}
