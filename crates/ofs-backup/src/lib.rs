//! Periodic, rotating project snapshot backups. The UI thread owns
//! scheduling (`AutoBackup::due`/`mark_attempted`, driven off
//! `Event::Tick`); the actual file I/O runs on a blocking task and
//! reports back through the event bus, matching `ofs-events`'s
//! `AsyncEventSource` completion-posting idiom.

use ofs_events::Event;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::Sender;

pub const BACKUP_PERIOD: Duration = Duration::from_secs(60);

/// Scheduling state for the backup loop. Does not itself touch the
/// filesystem — `due()` just answers "should a backup be requested now".
#[derive(Debug, Clone)]
pub struct AutoBackup {
    period: Duration,
    last_backup: Option<Instant>,
    suspended: bool,
}

impl AutoBackup {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_backup: None,
            suspended: false,
        }
    }

    /// Suspended during recording or other states where a mid-operation
    /// snapshot would be meaningless or disruptive.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }
    pub fn resume(&mut self) {
        self.suspended = false;
    }
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn due(&self, now: Instant) -> bool {
        if self.suspended {
            return false;
        }
        match self.last_backup {
            None => true,
            Some(last) => now.duration_since(last) >= self.period,
        }
    }

    pub fn mark_attempted(&mut self, now: Instant) {
        self.last_backup = Some(now);
    }
}

impl Default for AutoBackup {
    fn default() -> Self {
        Self::new(BACKUP_PERIOD)
    }
}

/// Timestamped `.backup` filename derived from the application's start
/// time and the current wall clock, per the rotation naming scheme.
pub fn backup_filename(app_start_unix_s: u64, now_unix_s: u64) -> String {
    format!("{app_start_unix_s}_{now_unix_s}.backup")
}

/// Deletes all prior `.backup` files in `dir`, then writes `bytes` as
/// `dir/filename`. Never clears the caller's `unsaved_edits` flag — that
/// decision belongs to the UI thread, not this worker.
pub async fn run_backup(dir: PathBuf, filename: String, bytes: Vec<u8>, events: Sender<Event>) {
    let target = dir.join(&filename);
    let result = tokio::task::spawn_blocking(move || -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&dir)?;
        for entry in std::fs::read_dir(&dir)?.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "backup") {
                let _ = std::fs::remove_file(&path);
            }
        }
        std::fs::write(&target, &bytes)?;
        Ok(target)
    })
    .await;

    let event = match result {
        Ok(Ok(path)) => Event::BackupCompleted { path: path.display().to_string() },
        Ok(Err(e)) => Event::BackupFailed { message: e.to_string() },
        Err(e) => Event::BackupFailed { message: e.to_string() },
    };
    if events.send(event).await.is_err() {
        tracing::warn!(target: "backup", "event channel closed before backup completion delivered");
    }
}

pub fn prior_backups(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "backup"))
        .collect()
}
