//! Media file discovery
//!
//! Finds lyrics that live next to, or inside, an audio file:
//! 1. Same-name `.lrc` file
//! 2. Embedded lyrics tag (USLT / LYRICS)

pub mod lyrics;

pub use lyrics::{FoundLyrics, LyricsOrigin, find_lyrics, find_lyrics_file};
