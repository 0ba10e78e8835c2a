//! Named time markers, optionally paired to define a clip range by a
//! `<base>_start` / `<base>_end` naming convention.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookmarkKind {
    Regular,
    StartMarker,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub at_seconds: f32,
    pub kind: BookmarkKind,
}

impl Bookmark {
    pub fn new(name: impl Into<String>, at_seconds: f32) -> Self {
        Self {
            name: name.into(),
            at_seconds,
            kind: BookmarkKind::Regular,
        }
    }
}

/// Applies the `_start`/`_end` naming convention: any bookmark named
/// `<base>_start` is upgraded to `StartMarker`, and its sibling named
/// `<base>_end`, if present, is upgraded to `EndMarker`.
pub fn pair_bookmarks(bookmarks: &mut [Bookmark]) {
    let starts: Vec<(usize, String)> = bookmarks
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.name.strip_suffix("_start").map(|base| (i, base.to_string())))
        .collect();

    for (start_idx, base) in starts {
        bookmarks[start_idx].kind = BookmarkKind::StartMarker;
        let end_name = format!("{base}_end");
        if let Some(end_idx) = bookmarks.iter().position(|b| b.name == end_name) {
            bookmarks[end_idx].kind = BookmarkKind::EndMarker;
        }
    }
}

/// One named clip range, `[start_s, end_s]`, derived from a bookmark.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRange {
    pub name: String,
    pub start_s: f32,
    pub end_s: f32,
}

/// Clip ranges formed by walking the bookmarks in time order. A
/// `StartMarker` ends at the next bookmark's time (consuming it, since
/// that next bookmark is its paired `EndMarker`). A `Regular` bookmark
/// ends at the next bookmark's time, or at `media_duration_s` if it is
/// the last bookmark. A lone `EndMarker` (no preceding `StartMarker`)
/// starts no range.
pub fn clip_ranges(bookmarks: &[Bookmark], media_duration_s: f32) -> Vec<ClipRange> {
    let mut sorted: Vec<&Bookmark> = bookmarks.iter().collect();
    sorted.sort_by(|a, b| a.at_seconds.total_cmp(&b.at_seconds));

    let mut ranges = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let b = sorted[i];
        match b.kind {
            BookmarkKind::EndMarker => {}
            BookmarkKind::StartMarker => {
                if let Some(&next) = sorted.get(i + 1) {
                    ranges.push(ClipRange {
                        name: b.name.clone(),
                        start_s: b.at_seconds,
                        end_s: next.at_seconds,
                    });
                    i += 1;
                }
            }
            BookmarkKind::Regular => {
                let end_s = sorted.get(i + 1).map_or(media_duration_s, |next| next.at_seconds);
                ranges.push(ClipRange {
                    name: b.name.clone(),
                    start_s: b.at_seconds,
                    end_s,
                });
            }
        }
        i += 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pairing_upgrades_matching_end() {
        let mut bookmarks = vec![
            Bookmark::new("intro_start", 1.0),
            Bookmark::new("intro_end", 5.0),
            Bookmark::new("unrelated", 9.0),
        ];
        pair_bookmarks(&mut bookmarks);
        assert_eq!(bookmarks[0].kind, BookmarkKind::StartMarker);
        assert_eq!(bookmarks[1].kind, BookmarkKind::EndMarker);
        assert_eq!(bookmarks[2].kind, BookmarkKind::Regular);
    }

    #[test]
    fn clip_ranges_pairs_start_with_following_end() {
        let mut bookmarks = vec![Bookmark::new("a_start", 2.0), Bookmark::new("a_end", 6.0)];
        pair_bookmarks(&mut bookmarks);
        let ranges = clip_ranges(&bookmarks, 100.0);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].name, "a_start");
        assert_eq!((ranges[0].start_s, ranges[0].end_s), (2.0, 6.0));
    }

    #[test]
    fn clip_ranges_pairs_regular_bookmarks_with_the_next_and_media_end() {
        let bookmarks = vec![Bookmark::new("chapter1", 0.0), Bookmark::new("chapter2", 10.0)];
        let ranges = clip_ranges(&bookmarks, 30.0);
        assert_eq!(
            ranges.iter().map(|r| (r.name.as_str(), r.start_s, r.end_s)).collect::<Vec<_>>(),
            vec![("chapter1", 0.0, 10.0), ("chapter2", 10.0, 30.0)]
        );
    }

    #[test]
    fn clip_ranges_drops_lone_end_marker() {
        let bookmarks = vec![Bookmark {
            name: "orphan_end".to_string(),
            at_seconds: 5.0,
            kind: BookmarkKind::EndMarker,
        }];
        assert!(clip_ranges(&bookmarks, 30.0).is_empty());
    }
}
