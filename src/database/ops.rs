//! Database operations organized by entity type

mod favorites;
mod history;
mod playback;
mod playlists;
mod songs;
mod stats;

pub use favorites::*;
pub use history::*;
pub use playback::*;
pub use playlists::*;
pub use songs::*;
pub use stats::*;

pub const KEY_LIBRARY: &str = "library";
pub const KEY_PLAYLISTS: &str = "playlists";
pub const KEY_FAVORITES: &str = "favorites";
pub const KEY_SETTINGS: &str = "settings";
pub const KEY_PLAYBACK_STATE: &str = "playbackState";
pub const KEY_SEARCH_HISTORY: &str = "searchHistory";
pub const KEY_STATS: &str = "stats";

/// Current Unix timestamp in milliseconds
pub fn current_timestamp() -> i64 {
    crate::utils::current_timestamp_ms()
}
