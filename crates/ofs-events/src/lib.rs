//! Typed event bus connecting background workers (save, waveform, backup,
//! clip export) and in-editor mutations to whatever owns the UI frame
//! loop. This crate carries no UI dependency itself — it only defines the
//! `Event` enum, a coalescing helper, and the async-source registration
//! pattern used to spawn producers onto a shared channel.

use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Capacity of the shared event channel. Sized generously since producers
/// are few (UI mutations, four background workers) and consumers drain
/// once per frame.
pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Observer-surface events. Not a wire protocol — no variant here is
/// persisted or sent over a network; it exists purely to let the UI
/// thread react to edits and background work completing.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A script's actions changed. Coalesced to at most one per frame per
    /// `script_id` by `Coalescer`.
    ActionsChanged { script_id: usize },
    /// A script's selection changed. Same coalescing rule as above.
    SelectionChanged { script_id: usize },
    ProjectLoaded,
    ProjectClosed,
    MediaDurationChanged { seconds: f32 },
    MediaTimeChanged { seconds: f32 },
    PlaybackStateChanged { paused: bool },
    BookmarkChanged,
    MetadataChanged,
    /// Background save completed for the named script.
    SaveCompleted { script_id: usize },
    SaveFailed { message: String },
    /// Autosave backup completed; `path` is the file that was written.
    BackupCompleted { path: String },
    BackupFailed { message: String },
    /// Waveform generation finished and the LOD is ready to render.
    WaveformReady,
    /// Clip export progress; `done` out of `total` bookmarks processed.
    ClipExportProgress { done: usize, total: usize },
    /// Periodic monotonic tick, used to drive the per-frame coalescing
    /// flush and autosave scheduling.
    Tick,
    Shutdown,
}

impl Event {
    /// The coalescing key: events sharing a key collapse to the last one
    /// seen within a frame. Events with no reasonable "last one wins"
    /// semantics (e.g. `SaveFailed`, `ClipExportProgress`) return `None`
    /// and are never coalesced.
    fn coalesce_key(&self) -> Option<CoalesceKey> {
        match self {
            Event::ActionsChanged { script_id } => Some(CoalesceKey::Actions(*script_id)),
            Event::SelectionChanged { script_id } => Some(CoalesceKey::Selection(*script_id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CoalesceKey {
    Actions(usize),
    Selection(usize),
}

/// Buffers events between frame boundaries, collapsing repeated
/// `ActionsChanged`/`SelectionChanged` for the same script to a single
/// delivery, per spec: "coalesced to at most one of each per UI frame".
#[derive(Debug, Default)]
pub struct Coalescer {
    pending: Vec<Event>,
    seen: std::collections::HashSet<CoalesceKey>,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `event`. Coalescable events are deduplicated by key; the
    /// first occurrence in a frame wins the queue position, matching
    /// "observers may not assume intermediate states" — only that at
    /// least one notification arrives per dirtying frame.
    pub fn push(&mut self, event: Event) {
        match event.coalesce_key() {
            Some(key) if self.seen.contains(&key) => {}
            Some(key) => {
                self.seen.insert(key);
                self.pending.push(event);
            }
            None => self.pending.push(event),
        }
    }

    /// Drains all queued events, clearing the coalescing window for the
    /// next frame. Call once per frame boundary.
    pub fn flush(&mut self) -> Vec<Event> {
        self.seen.clear();
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Trait implemented by any async event producer: the save worker, the
/// waveform generator, the autosave ticker, the clip exporter. Each
/// source owns its configuration and spawns one background task that
/// pushes events into the shared channel, terminating when the channel
/// closes.
pub trait AsyncEventSource: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawns all registered sources, draining the registry so a second
    /// call spawns nothing.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Built-in monotonic tick source driving the per-frame coalescing flush.
pub struct TickEventSource {
    interval: Duration,
}

impl TickEventSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}

pub type EventResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    #[test]
    fn coalescer_collapses_repeated_actions_changed() {
        let mut c = Coalescer::new();
        c.push(Event::ActionsChanged { script_id: 0 });
        c.push(Event::ActionsChanged { script_id: 0 });
        c.push(Event::SelectionChanged { script_id: 0 });
        c.push(Event::ActionsChanged { script_id: 1 });
        let flushed = c.flush();
        assert_eq!(flushed.len(), 3);
        assert!(c.is_empty());
    }

    #[test]
    fn coalescer_does_not_collapse_non_coalescable_events() {
        let mut c = Coalescer::new();
        c.push(Event::ClipExportProgress { done: 1, total: 5 });
        c.push(Event::ClipExportProgress { done: 2, total: 5 });
        assert_eq!(c.flush().len(), 2);
    }

    #[test]
    fn coalescer_resets_between_frames() {
        let mut c = Coalescer::new();
        c.push(Event::ActionsChanged { script_id: 0 });
        c.flush();
        c.push(Event::ActionsChanged { script_id: 0 });
        assert_eq!(c.flush().len(), 1);
    }

    struct MockCloseSource {
        flag: Arc<AtomicBool>,
    }

    impl AsyncEventSource for MockCloseSource {
        fn name(&self) -> &'static str {
            "mock_close"
        }
        fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
            let flag = self.flag;
            tokio::spawn(async move {
                tx.closed().await;
                flag.store(true, Ordering::SeqCst);
            })
        }
    }

    #[tokio::test]
    async fn registry_sources_exit_on_channel_drop() {
        let (tx, rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        let flag = Arc::new(AtomicBool::new(false));
        reg.register(MockCloseSource { flag: flag.clone() });
        let handles = reg.spawn_all(&tx);

        drop(tx);
        drop(rx);

        for handle in handles {
            tokio::time::timeout(Duration::from_millis(200), handle)
                .await
                .expect("source task did not observe channel closure")
                .expect("source task should exit cleanly");
        }
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn tick_source_emits_periodically() {
        let (tx, mut rx) = mpsc::channel::<Event>(8);
        let mut reg = EventSourceRegistry::new();
        reg.register(TickEventSource::new(Duration::from_millis(5)));
        let handles = reg.spawn_all(&tx);

        let ev = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("timed out waiting for tick")
            .expect("channel closed unexpectedly");
        assert_eq!(ev, Event::Tick);

        drop(tx);
        drop(rx);
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_millis(50), handle).await;
        }
    }
}
