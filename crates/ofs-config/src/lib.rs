//! Ambient configuration: an optional `ofsc.toml` carrying the handful
//! of knobs the core itself needs (autosave cadence, heatmap/waveform
//! tuning, the overlay fps fallback). Keybindings and T-Code device
//! settings live in the outer application's own config files and are
//! not modeled here.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub interval_seconds: u32,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Sliding-window half-width, in seconds, used to bucket actions
    /// into local-density segments.
    pub kernel_seconds: f32,
    /// Density value (strokes/second) that maps to the hottest color
    /// stop before clamping.
    pub max_density: f32,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            kernel_seconds: 2.5,
            max_density: 12.25,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct WaveformConfig {
    /// Divides the viewport width to get the desired number of PCM
    /// samples per on-screen pixel when building a new LOD.
    pub samples_per_pixel_divisor: u32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel_divisor: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Frame-grid fps used when the media container reports none.
    pub default_fps: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { default_fps: 30.0 }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub autosave: AutosaveConfig,
    pub heatmap: HeatmapConfig,
    pub waveform: WaveformConfig,
    pub overlay: OverlayConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub raw: Option<String>,
    pub file: ConfigFile,
}

/// Best-effort config path: local working-directory file first, then
/// the platform config dir, falling back to the relative filename.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("ofsc.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("OpenFunscripter").join("ofsc.toml");
    }
    PathBuf::from("ofsc.toml")
}

/// Loads from `path` (or `discover()`'s result). A missing file or a
/// parse error both fall back to defaults rather than failing the
/// caller outright — an unreadable ambient config should never block
/// opening a project.
pub fn load_from(path: Option<PathBuf>) -> Result<AppConfig> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(AppConfig::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(AppConfig {
            raw: Some(content),
            file,
        }),
        Err(e) => {
            info!(target: "config", path = %path.display(), error = %e, "falling back to default config after parse error");
            Ok(AppConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file, ConfigFile::default());
        assert_eq!(cfg.file.autosave.interval_seconds, 60);
    }

    #[test]
    fn parses_overridden_values() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[autosave]\nenabled = false\ninterval_seconds = 30\n[heatmap]\nmax_density = 20.0\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(!cfg.file.autosave.enabled);
        assert_eq!(cfg.file.autosave.interval_seconds, 30);
        assert_eq!(cfg.file.heatmap.max_density, 20.0);
        assert_eq!(cfg.file.heatmap.kernel_seconds, 2.5);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not valid toml [[[").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file, ConfigFile::default());
    }
}

