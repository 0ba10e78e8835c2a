use std::path::PathBuf;
use thiserror::Error;

/// Failures parsing or writing a single-axis funscript JSON file.
#[derive(Debug, Error)]
pub enum FunscriptError {
    #[error("malformed funscript {path}: {source}")]
    MalformedFunscript {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write funscript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures loading, saving, or mutating a project container.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project {path} has version {found}, only version 1 is supported")]
    VersionMismatch { path: PathBuf, found: u32 },
    #[error("project container {path} is truncated or corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("media file {0} does not exist")]
    MediaMissing(PathBuf),
    #[error("failed to save project {path}: {source}")]
    SaveIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a script at {0} is already part of this project")]
    DuplicatePath(PathBuf),
    #[error("cannot remove the last script in a project")]
    LastScript,
    #[error(transparent)]
    Funscript(#[from] FunscriptError),
}
