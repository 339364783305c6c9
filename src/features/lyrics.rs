//! Lyrics module - parsing and playback synchronization
//!
//! - `parser`: LRC parsing, translation merging, lyric sources
//! - `sync`: playback position to active line mapping

pub mod parser;
pub mod sync;

// Re-export commonly used items
pub use parser::*;
pub use sync::{HighlightChange, HighlightState, LyricSync, active_index};
