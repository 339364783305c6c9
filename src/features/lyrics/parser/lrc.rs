//! Standard LRC format parser
//!
//! Supports the common [mm:ss.xx]text format with line-level synchronization.
//! Parsing is lenient: anything that does not look like a timed line is skipped.

use lazy_static::lazy_static;
use regex::Regex;

use super::types::{LyricLine, LyricTrack};

lazy_static! {
    static ref TIMESTAMP: Regex = Regex::new(r"^\[(\d{2,}):(\d{2})\.(\d{1,3})\]").unwrap();
}

/// Parse one leading timestamp: [mm:ss.xx] or [mm:ss.xxx]
///
/// Returns the number of bytes consumed and the offset in milliseconds.
fn parse_time(src: &str) -> Option<(usize, u64)> {
    let caps = TIMESTAMP.captures(src)?;

    let min: u64 = caps[1].parse().ok()?;
    let sec: u64 = caps[2].parse().ok()?;
    // ".5" / ".50" / ".500" all mean 500ms
    let fraction = format!("{:0<3}", &caps[3]);
    let ms: u64 = fraction.parse().ok()?;

    // unbounded minutes: overflowing stamps are rejected like malformed ones
    let total = min.checked_mul(60_000)?.checked_add(sec * 1000 + ms)?;
    Some((caps[0].len(), total))
}

/// Parse a single LRC line into one entry per leading timestamp
///
/// `[00:12.50][01:30.00]Chorus` yields two entries sharing the text.
/// Metadata tags like `[ar:Artist]` and lines with blank text yield nothing.
pub fn parse_line_all(line: &str) -> Vec<LyricLine> {
    // `trim` keeps U+FEFF, which would hide the first stamp from the anchored regex
    let line = line.trim().trim_start_matches('\u{feff}').trim_start();
    let mut timestamps = Vec::new();
    let mut pos = 0;

    while pos < line.len() {
        match parse_time(&line[pos..]) {
            Some((consumed, time)) => {
                timestamps.push(time);
                pos += consumed;
            }
            None => break,
        }
    }

    if timestamps.is_empty() {
        return Vec::new();
    }

    let text = line[pos..].trim();
    if text.is_empty() {
        return Vec::new();
    }

    timestamps
        .into_iter()
        .map(|ms| LyricLine::new(ms as f64 / 1000.0, text))
        .collect()
}

/// Parse a single LRC line
///
/// Returns `None` if the line has no leading timestamp or its text is blank.
/// For lines with several leading timestamps the first one is used.
pub fn parse_line(line: &str) -> Option<LyricLine> {
    parse_line_all(line).into_iter().next()
}

/// Parse LRC content into a sorted track
pub fn parse_lrc(src: &str) -> LyricTrack {
    let lines = src.lines();
    let mut result = Vec::with_capacity(lines.size_hint().1.unwrap_or(128).min(1024));

    for line in lines {
        result.extend(parse_line_all(line));
    }

    LyricTrack::from_lines(result)
}
