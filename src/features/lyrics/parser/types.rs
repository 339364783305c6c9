//! Lyrics data types
//!
//! Owned, immutable-after-build values shared by the parser and the sync cursor.

use serde::{Deserialize, Serialize};

/// A single timed line of lyrics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricLine {
    /// Playback offset in seconds (never negative)
    pub offset_seconds: f64,
    /// Lyric text, trimmed and never empty
    pub text: String,
    /// Translation attached by `merge_translation`
    #[serde(default)]
    pub translated_text: Option<String>,
}

impl LyricLine {
    pub fn new(offset_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            offset_seconds,
            text: text.into(),
            translated_text: None,
        }
    }
}

/// Time-ordered lyric lines for one song
///
/// Lines are sorted ascending by offset; lines sharing an offset keep
/// their input order. The track does not know which song it belongs to,
/// the owner keys it externally.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LyricTrack {
    pub lines: Vec<LyricLine>,
}

impl LyricTrack {
    /// Build a track from already-parsed lines, sorting them stably by offset
    pub fn from_lines(mut lines: Vec<LyricLine>) -> Self {
        // `sort_by` is stable, which keeps simultaneous (duet) lines in input order
        lines.sort_by(|a, b| a.offset_seconds.total_cmp(&b.offset_seconds));
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LyricLine> {
        self.lines.iter()
    }

    /// Whether any line carries a translation
    pub fn has_translation(&self) -> bool {
        self.lines.iter().any(|l| l.translated_text.is_some())
    }

    /// Offset of the last line, if any
    pub fn last_offset(&self) -> Option<f64> {
        self.lines.last().map(|l| l.offset_seconds)
    }
}

impl<'a> IntoIterator for &'a LyricTrack {
    type Item = &'a LyricLine;
    type IntoIter = std::slice::Iter<'a, LyricLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
