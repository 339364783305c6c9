//! Lyrics parsing module
//!
//! Builds time-ordered tracks from LRC text and attaches translation tracks.
//! Every entry point is total: bad input yields fewer lines, never an error.

pub mod lrc;
mod online;
mod types;

pub use online::*;
pub use types::*;

/// Maximum offset difference (seconds) for a translation line to attach
pub const TRANSLATION_MATCH_WINDOW: f64 = 0.5;

/// Parse a raw LRC blob into a sorted track
///
/// Empty input, or input without any timed line, gives an empty track.
pub fn build_track(raw: &str) -> LyricTrack {
    lrc::parse_lrc(raw)
}

/// Attach a translation to each line of `primary`, producing a new track
///
/// A translation line qualifies when its offset is within
/// [`TRANSLATION_MATCH_WINDOW`] of the primary line. Among several
/// candidates the closest wins; exact ties go to the earliest one in the
/// translation's sorted order.
pub fn merge_translation(primary: &LyricTrack, translation_raw: &str) -> LyricTrack {
    if translation_raw.trim().is_empty() {
        return primary.clone();
    }

    let translation = build_track(translation_raw);
    let mut merged = primary.clone();

    for line in merged.lines.iter_mut() {
        let mut best: Option<(&LyricLine, f64)> = None;
        for candidate in translation.iter() {
            let diff = (candidate.offset_seconds - line.offset_seconds).abs();
            if diff >= TRANSLATION_MATCH_WINDOW {
                continue;
            }
            match best {
                Some((_, best_diff)) if diff >= best_diff => {}
                _ => best = Some((candidate, diff)),
            }
        }

        if let Some((candidate, _)) = best {
            line.translated_text = Some(candidate.text.clone());
        }
    }

    merged
}

/// Build a track and merge an optional translation in one step
pub fn build_track_with_translation(raw: &str, translation_raw: Option<&str>) -> LyricTrack {
    let track = build_track(raw);
    match translation_raw {
        Some(translation) => merge_translation(&track, translation),
        None => track,
    }
}
