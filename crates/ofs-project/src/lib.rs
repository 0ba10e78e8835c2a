//! `Project`: the durable bundle owning one media reference, one or
//! more scripts, metadata, bookmarks, tempo state, and simulator/window
//! state. Persisted via a versioned binary container plus one JSON
//! funscript per script axis.

pub mod bookmark;
pub mod container;
pub mod error;
pub mod funscript;
pub mod workers;

pub use bookmark::{Bookmark, BookmarkKind};
pub use error::{FunscriptError, ProjectError};
pub use funscript::Metadata;

use ofs_script::Script;
use std::path::{Path, PathBuf};

/// Axes discovered as funscript siblings of the root script.
pub const AXIS_NAMES: [&str; 6] = ["roll", "pitch", "twist", "raw", "surge", "sway"];
const AXIS_REORDER_LAST: [&str; 3] = ["twist", "pitch", "roll"];

pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mkv", "webm", "wmv", "avi", "m4v"];
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "flac", "wmv", "ogg"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub bpm: f32,
    pub beat_offset_seconds: f32,
    pub measure_index: usize,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            bpm: 120.0,
            beat_offset_seconds: 0.0,
            measure_index: 2,
        }
    }
}

/// A script plus the per-axis metadata that travels with it in the
/// project container (distinct from the project-level `Metadata`).
pub struct ProjectScript {
    pub script: Script,
    pub metadata: Metadata,
}

pub struct Project {
    pub media_path: PathBuf,
    scripts: Vec<ProjectScript>,
    pub metadata: Metadata,
    pub bookmarks: Vec<Bookmark>,
    pub tempo: Tempo,
    /// Opaque blobs owned by the simulator/window layers; the core only
    /// round-trips these, never interprets them.
    pub simulator_state: Vec<u8>,
    pub window_state: Vec<u8>,
    pub active_script_index: usize,
    pub last_player_position_seconds: f32,
}

impl Project {
    /// Creates a new project with a single empty, untitled root script.
    pub fn new_empty(media_path: PathBuf) -> Self {
        let root = ProjectScript {
            script: Script::new("root", PathBuf::from("untitled.funscript")),
            metadata: Metadata::default(),
        };
        Self {
            media_path,
            scripts: vec![root],
            metadata: Metadata::default(),
            bookmarks: Vec::new(),
            tempo: Tempo::default(),
            simulator_state: Vec::new(),
            window_state: Vec::new(),
            active_script_index: 0,
            last_player_position_seconds: 0.0,
        }
    }

    pub fn scripts(&self) -> &[ProjectScript] {
        &self.scripts
    }
    pub fn scripts_mut(&mut self) -> &mut [ProjectScript] {
        &mut self.scripts
    }
    pub fn script(&self, idx: usize) -> Option<&Script> {
        self.scripts.get(idx).map(|s| &s.script)
    }
    pub fn script_mut(&mut self, idx: usize) -> Option<&mut Script> {
        self.scripts.get_mut(idx).map(|s| &mut s.script)
    }

    pub fn has_unsaved_edits(&self) -> bool {
        self.scripts.iter().any(|s| s.script.unsaved_edits())
    }

    pub fn clear_unsaved_edits(&mut self) {
        for s in &mut self.scripts {
            s.script.clear_unsaved_edits();
        }
    }

    /// Adds `script` at `path`. Fails if a script at that path already
    /// exists.
    pub fn add_script(&mut self, script: Script, metadata: Metadata) -> Result<(), ProjectError> {
        if self.scripts.iter().any(|s| s.script.path == script.path) {
            return Err(ProjectError::DuplicatePath(script.path));
        }
        self.scripts.push(ProjectScript { script, metadata });
        Ok(())
    }

    /// Removes the script at `idx`. Forbidden when it would leave the
    /// project with zero scripts.
    pub fn remove_script(&mut self, idx: usize) -> Result<(), ProjectError> {
        if self.scripts.len() <= 1 {
            return Err(ProjectError::LastScript);
        }
        if idx < self.scripts.len() {
            self.scripts.remove(idx);
            if self.active_script_index >= self.scripts.len() {
                self.active_script_index = self.scripts.len() - 1;
            }
        }
        Ok(())
    }

    // ---- funscript import / export ------------------------------------------

    /// Loads the root funscript at `path` plus any sibling axis
    /// funscripts discovered by the `<base>.<axis>.funscript` naming
    /// pattern, reordering so `twist, pitch, roll` land last.
    pub fn import_funscript(path: &Path) -> Result<Self, ProjectError> {
        let base = strip_funscript_suffix(path);
        let media_path = find_sibling_media(&base).unwrap_or_else(|| path.to_path_buf());

        let mut project = Self::new_empty(media_path);
        project.scripts.clear();

        let root_bytes = std::fs::read(path).map_err(|source| {
            ProjectError::Funscript(FunscriptError::Io {
                path: path.to_path_buf(),
                source,
            })
        })?;
        let (root_actions, root_meta) = funscript::parse(path, &root_bytes)?;
        project.scripts.push(ProjectScript {
            script: Script::from_actions("root", path.to_path_buf(), root_actions),
            metadata: root_meta,
        });

        for axis in AXIS_NAMES {
            let sibling = base.with_extension(format!("{axis}.funscript"));
            if !sibling.exists() {
                continue;
            }
            let bytes = std::fs::read(&sibling).map_err(|source| {
                ProjectError::Funscript(FunscriptError::Io {
                    path: sibling.clone(),
                    source,
                })
            })?;
            let (actions, meta) = funscript::parse(&sibling, &bytes)?;
            project.scripts.push(ProjectScript {
                script: Script::from_actions(axis, sibling, actions),
                metadata: meta,
            });
        }

        reorder_axes_last(&mut project.scripts);
        Ok(project)
    }

    pub fn export_funscript(&self, path: &Path, idx: usize) -> Result<(), ProjectError> {
        let s = self
            .scripts
            .get(idx)
            .ok_or_else(|| ProjectError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("no script at index {idx}"),
            })?;
        let bytes = funscript::serialize(s.script.actions(), &s.metadata)?;
        std::fs::write(path, bytes).map_err(|source| ProjectError::SaveIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn export_funscripts(&self, dir: &Path) -> Result<(), ProjectError> {
        for (i, s) in self.scripts.iter().enumerate() {
            let name = s.script.path.file_name().ok_or_else(|| ProjectError::Corrupt {
                path: dir.to_path_buf(),
                reason: "script path has no filename".to_string(),
            })?;
            self.export_funscript(&dir.join(name), i)?;
        }
        Ok(())
    }

    /// Builds clip export jobs from the bookmark-derived ranges: a video
    /// slicer job per clip, and a sliced `.funscript` per loaded script
    /// written directly to `dir`, each with interpolated boundary
    /// actions so clip-boundary positions match.
    pub fn export_clips_spec(
        &self,
        media_base_dir: &Path,
        dir: &Path,
        media_duration_s: f32,
    ) -> Result<Vec<workers::ClipSpec>, ProjectError> {
        let ranges = bookmark::clip_ranges(&self.bookmarks, media_duration_s);
        let mut jobs = Vec::with_capacity(ranges.len());
        for range in &ranges {
            for s in &self.scripts {
                let clip_actions = s.script.clip_slice(range.start_s, range.end_s);
                let bytes = funscript::serialize(&clip_actions, &s.metadata)?;
                let out_path = dir.join(format!("{}_{}.funscript", s.script.title, range.name));
                std::fs::write(&out_path, bytes).map_err(|source| ProjectError::SaveIo {
                    path: out_path,
                    source,
                })?;
            }
            jobs.push(workers::ClipSpec {
                media_path: media_base_dir.join(&self.media_path),
                output_path: dir.join(format!("{}.mp4", range.name)),
                start_s: range.start_s,
                end_s: range.end_s,
            });
        }
        Ok(jobs)
    }

    // ---- binary container -----------------------------------------------------

    pub fn save_to_bytes(&self) -> Vec<u8> {
        let mut w = container::Writer::new();
        w.u32(container::VERSION);
        w.string(&self.media_path.to_string_lossy());

        w.u32(self.bookmarks.len() as u32);
        for b in &self.bookmarks {
            w.string(&b.name);
            w.f32(b.at_seconds);
            w.u8(match b.kind {
                BookmarkKind::Regular => 0,
                BookmarkKind::StartMarker => 1,
                BookmarkKind::EndMarker => 2,
            });
        }
        w.f32(self.tempo.bpm);
        w.f32(self.tempo.beat_offset_seconds);
        w.u32(self.tempo.measure_index as u32);
        w.bytes(&self.simulator_state);
        w.bytes(&self.window_state);
        w.u32(self.active_script_index as u32);
        w.f32(self.last_player_position_seconds);

        w.u32(self.scripts.len() as u32);
        for s in &self.scripts {
            w.actions(s.script.actions());
            w.string(&s.script.path.to_string_lossy());
            w.string(&s.script.title);
            let meta_json = serde_json::to_vec(&s.metadata).unwrap_or_default();
            w.bytes(&meta_json);
        }
        w.into_bytes()
    }

    pub fn load_from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, ProjectError> {
        let mut r = container::Reader::new(bytes, path);
        let version = r.u32()?;
        if version != container::VERSION {
            return Err(ProjectError::VersionMismatch {
                path: path.to_path_buf(),
                found: version,
            });
        }
        let media_path = PathBuf::from(r.string()?);

        let bookmark_count = r.u32()? as usize;
        let mut bookmarks = Vec::with_capacity(bookmark_count);
        for _ in 0..bookmark_count {
            let name = r.string()?;
            let at_seconds = r.f32()?;
            let kind = match r.u8()? {
                1 => BookmarkKind::StartMarker,
                2 => BookmarkKind::EndMarker,
                _ => BookmarkKind::Regular,
            };
            bookmarks.push(Bookmark { name, at_seconds, kind });
        }
        let tempo = Tempo {
            bpm: r.f32()?,
            beat_offset_seconds: r.f32()?,
            measure_index: r.u32()? as usize,
        };
        let simulator_state = r.bytes()?;
        let window_state = r.bytes()?;
        let active_script_index = r.u32()? as usize;
        let last_player_position_seconds = r.f32()?;

        let script_count = r.u32()? as usize;
        let mut scripts = Vec::with_capacity(script_count);
        for _ in 0..script_count {
            let actions = r.actions()?;
            let script_path = PathBuf::from(r.string()?);
            let title = r.string()?;
            let meta_bytes = r.bytes()?;
            let metadata: Metadata = serde_json::from_slice(&meta_bytes).unwrap_or_default();
            scripts.push(ProjectScript {
                script: Script::from_actions(title, script_path, actions),
                metadata,
            });
        }
        if scripts.is_empty() {
            return Err(ProjectError::Corrupt {
                path: path.to_path_buf(),
                reason: "project container has zero scripts".to_string(),
            });
        }

        Ok(Self {
            media_path,
            scripts,
            metadata: Metadata::default(),
            bookmarks,
            tempo,
            simulator_state,
            window_state,
            active_script_index,
            last_player_position_seconds,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let bytes = std::fs::read(path).map_err(|source| ProjectError::SaveIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_bytes(path, &bytes)
    }

    pub fn save(&mut self, path: &Path, clear_dirty: bool) -> Result<(), ProjectError> {
        let bytes = self.save_to_bytes();
        std::fs::write(path, bytes).map_err(|source| ProjectError::SaveIo {
            path: path.to_path_buf(),
            source,
        })?;
        if clear_dirty {
            self.clear_unsaved_edits();
        }
        Ok(())
    }

    pub fn media_exists(&self, base_dir: &Path) -> bool {
        base_dir.join(&self.media_path).exists()
    }
}

fn strip_funscript_suffix(path: &Path) -> PathBuf {
    let mut base = path.to_path_buf();
    if base.extension().is_some_and(|e| e == "funscript") {
        base.set_extension("");
    }
    base
}

fn find_sibling_media(base: &Path) -> Option<PathBuf> {
    let dir = base.parent()?;
    let stem = base.file_name()?;
    VIDEO_EXTENSIONS
        .iter()
        .chain(AUDIO_EXTENSIONS.iter())
        .map(|ext| dir.join(stem).with_extension(ext))
        .find(|candidate| candidate.exists())
}

/// Reorders `twist, pitch, roll` to the end of the discovered sibling
/// list so indices 1..3 are stable for the 3D simulator, preserving
/// otherwise-discovered order.
fn reorder_axes_last(scripts: &mut Vec<ProjectScript>) {
    if scripts.len() <= 1 {
        return;
    }
    let root = scripts.remove(0);
    let mut tail = Vec::new();
    let mut rest = Vec::new();
    for s in scripts.drain(..) {
        if AXIS_REORDER_LAST.contains(&s.script.title.as_str()) {
            tail.push(s);
        } else {
            rest.push(s);
        }
    }
    tail.sort_by_key(|s| AXIS_REORDER_LAST.iter().position(|a| *a == s.script.title).unwrap());
    scripts.push(root);
    scripts.extend(rest);
    scripts.extend(tail);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofs_action::Action;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_empty_project_has_one_script() {
        let p = Project::new_empty(PathBuf::from("video.mp4"));
        assert_eq!(p.scripts().len(), 1);
    }

    #[test]
    fn remove_script_forbidden_when_last() {
        let mut p = Project::new_empty(PathBuf::from("video.mp4"));
        assert!(p.remove_script(0).is_err());
    }

    #[test]
    fn add_script_rejects_duplicate_path() {
        let mut p = Project::new_empty(PathBuf::from("video.mp4"));
        let dup_path = p.scripts()[0].script.path.clone();
        let dup = Script::new("dup", dup_path);
        assert!(p.add_script(dup, Metadata::default()).is_err());
    }

    #[test]
    fn binary_round_trip_preserves_actions_and_bookmarks() {
        let mut p = Project::new_empty(PathBuf::from("video.mp4"));
        p.script_mut(0).unwrap().add_action(Action::new(1.0, 50));
        p.bookmarks.push(Bookmark::new("intro_start", 0.5));
        p.tempo.bpm = 140.0;

        let bytes = p.save_to_bytes();
        let restored = Project::load_from_bytes(Path::new("x.ofsproject"), &bytes).unwrap();

        assert_eq!(
            restored.script(0).unwrap().actions().as_slice(),
            p.script(0).unwrap().actions().as_slice()
        );
        assert_eq!(restored.bookmarks.len(), 1);
        assert_eq!(restored.tempo.bpm, 140.0);
    }

    #[test]
    fn load_rejects_wrong_version() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        let err = Project::load_from_bytes(Path::new("x.ofsproject"), &bytes).unwrap_err();
        assert!(matches!(err, ProjectError::VersionMismatch { found: 2, .. }));
    }

    #[test]
    fn export_clips_spec_slices_funscripts_with_interpolated_boundaries() {
        let mut p = Project::new_empty(PathBuf::from("video.mp4"));
        p.script_mut(0).unwrap().add_action(Action::new(0.0, 0));
        p.script_mut(0).unwrap().add_action(Action::new(10.0, 100));
        p.bookmarks.push(Bookmark::new("chapter1", 2.0));

        let dir = tempfile::tempdir().unwrap();
        let jobs = p.export_clips_spec(Path::new("."), dir.path(), 6.0).unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!((jobs[0].start_s, jobs[0].end_s), (2.0, 6.0));

        let out_path = dir.path().join("root_chapter1.funscript");
        assert!(out_path.exists());
        let bytes = std::fs::read(&out_path).unwrap();
        let (actions, _) = funscript::parse(&out_path, &bytes).unwrap();
        assert_eq!(actions.as_slice()[0].at, 0.0);
        assert_eq!(actions.as_slice()[0].pos, 20);
        let last = actions.as_slice().last().unwrap();
        assert_eq!(last.at, 4.0);
        assert_eq!(last.pos, 60);
    }
}
