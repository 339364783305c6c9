//! Playback position to lyric line mapping
//!
//! `active_index` is a stateless linear scan, so seeking in either direction
//! needs no special handling. `LyricSync` wraps it with the last reported
//! highlight so callers only react when the active line actually changes.

use super::LyricTrack;

/// Index of the line whose timestamp has most recently passed
///
/// Returns `None` before the first line, for an empty track, and for a NaN
/// playback time. Lines are sorted, so the scan stops at the first line
/// still in the future.
pub fn active_index(track: &LyricTrack, current_time_secs: f64) -> Option<usize> {
    let mut current = None;
    for (idx, line) in track.lines.iter().enumerate() {
        if line.offset_seconds <= current_time_secs {
            current = Some(idx);
        } else {
            break;
        }
    }
    current
}

/// Highlight state of the lyric display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightState {
    #[default]
    NoActiveLine,
    ActiveLine(usize),
}

impl HighlightState {
    pub fn index(self) -> Option<usize> {
        match self {
            HighlightState::NoActiveLine => None,
            HighlightState::ActiveLine(idx) => Some(idx),
        }
    }
}

impl From<Option<usize>> for HighlightState {
    fn from(index: Option<usize>) -> Self {
        match index {
            Some(idx) => HighlightState::ActiveLine(idx),
            None => HighlightState::NoActiveLine,
        }
    }
}

/// A transition between two highlight states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightChange {
    pub previous: HighlightState,
    pub current: HighlightState,
}

/// Lyric track plus the last reported highlight
///
/// Owned by the playback session. The track is replaced wholesale when a
/// new song loads; it is never edited in place.
#[derive(Debug, Clone, Default)]
pub struct LyricSync {
    track: Option<LyricTrack>,
    state: HighlightState,
}

impl LyricSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current track and reset the highlight
    pub fn load(&mut self, track: LyricTrack) {
        tracing::debug!("Lyric sync loaded {} lines", track.len());
        self.track = Some(track);
        self.state = HighlightState::NoActiveLine;
    }

    /// Drop the current track (song changed or lyrics unavailable)
    pub fn clear(&mut self) {
        self.track = None;
        self.state = HighlightState::NoActiveLine;
    }

    pub fn track(&self) -> Option<&LyricTrack> {
        self.track.as_ref()
    }

    /// True when no track is loaded or the loaded one has zero lines
    pub fn is_empty(&self) -> bool {
        self.track.as_ref().is_none_or(|t| t.is_empty())
    }

    pub fn state(&self) -> HighlightState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.state.index()
    }

    /// Recompute the highlight for `current_time_secs`
    ///
    /// Returns the transition only when the active line differs from the
    /// previously reported one.
    pub fn update(&mut self, current_time_secs: f64) -> Option<HighlightChange> {
        let next: HighlightState = self
            .track
            .as_ref()
            .and_then(|t| active_index(t, current_time_secs))
            .into();

        if next == self.state {
            return None;
        }

        let change = HighlightChange {
            previous: self.state,
            current: next,
        };
        self.state = next;
        Some(change)
    }
}
