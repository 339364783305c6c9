//! mymusic - local music library core
//!
//! Library import, JSON persistence, playlists and favorites, online lyric
//! lookup, and a headless player session that keeps LRC lyrics in sync with
//! the playback clock.

pub mod api;
pub mod database;
pub mod features;
pub mod player;
pub mod utils;
