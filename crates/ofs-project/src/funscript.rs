//! Single-axis funscript JSON: `{version, inverted, range, metadata,
//! actions: [{at, pos}]}`. `at` is milliseconds on disk, seconds in
//! memory (grounded on `original_source/OFS-lib/Funscript/Funscript.h`'s
//! `open`/`save` pair).

use crate::error::FunscriptError;
use ofs_action::{Action, ActionSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub script_url: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub performers: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub notes: String,
    /// Whole seconds.
    #[serde(default)]
    pub duration: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawAction {
    at: i64,
    pos: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunscriptFile {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    inverted: bool,
    #[serde(default = "default_range")]
    range: i32,
    #[serde(default)]
    metadata: Metadata,
    actions: Vec<RawAction>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_range() -> i32 {
    100
}

/// Parses a funscript JSON document. Negative `at` values are skipped
/// silently; duplicate timestamps are deduplicated (last write wins);
/// `version`/`inverted`/`range` are read but otherwise ignored.
pub fn parse(path: &Path, bytes: &[u8]) -> Result<(ActionSet, Metadata), FunscriptError> {
    let file: FunscriptFile =
        serde_json::from_slice(bytes).map_err(|source| FunscriptError::MalformedFunscript {
            path: path.to_path_buf(),
            source,
        })?;

    let mut actions = ActionSet::new();
    actions.insert_unchecked_bulk(
        file.actions
            .into_iter()
            .filter(|a| a.at >= 0)
            .map(|a| Action::new(a.at as f32 / 1000.0, a.pos)),
    );
    actions.sort();

    Ok((actions, file.metadata))
}

/// Serializes to the on-disk funscript JSON shape. `version`,
/// `inverted`, and `range` are always written with their canonical
/// defaults (`"1.0"`, `false`, `100`) since the core treats them as
/// ignored-on-load bookkeeping.
pub fn serialize(actions: &ActionSet, metadata: &Metadata) -> Result<Vec<u8>, FunscriptError> {
    let file = FunscriptFile {
        version: "1.0".to_string(),
        inverted: false,
        range: 100,
        metadata: metadata.clone(),
        actions: actions
            .iter()
            .map(|a| RawAction {
                at: (a.at * 1000.0).round() as i64,
                pos: a.pos as i32,
            })
            .collect(),
    };
    serde_json::to_vec_pretty(&file).map_err(|source| FunscriptError::MalformedFunscript {
        path: Path::new("<memory>").to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_converts_ms_to_seconds() {
        let json = br#"{"version":"1.0","inverted":false,"range":100,"actions":[{"at":1000,"pos":50}]}"#;
        let (actions, _) = parse(Path::new("x.funscript"), json).unwrap();
        assert_eq!(actions.as_slice()[0].at, 1.0);
        assert_eq!(actions.as_slice()[0].pos, 50);
    }

    #[test]
    fn parse_skips_negative_at_and_dedups() {
        let json = br#"{"version":"1.0","inverted":false,"range":100,"actions":[
            {"at":-5,"pos":10},
            {"at":1000,"pos":10},
            {"at":1000,"pos":90}
        ]}"#;
        let (actions, _) = parse(Path::new("x.funscript"), json).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions.as_slice()[0].pos, 90);
    }

    #[test]
    fn round_trip_preserves_actions_modulo_formatting() {
        let mut original = ActionSet::new();
        original.insert(Action::new(1.5, 40));
        original.insert(Action::new(2.5, 80));
        let meta = Metadata {
            title: "t".into(),
            ..Default::default()
        };
        let bytes = serialize(&original, &meta).unwrap();
        let (round_tripped, round_meta) = parse(Path::new("x.funscript"), &bytes).unwrap();
        assert_eq!(original.as_slice(), round_tripped.as_slice());
        assert_eq!(meta, round_meta);
    }

    #[test]
    fn missing_actions_array_is_a_parse_error() {
        let json = br#"{"version":"1.0","inverted":false,"range":100}"#;
        assert!(parse(Path::new("x.funscript"), json).is_err());
    }
}
