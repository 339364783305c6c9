//! Database module for persistent storage
//! Stores the library, playlists, favorites and playback state as JSON blobs
//! in a prefixed key-value directory

mod models;
mod ops;
mod repository;
mod store;

pub use models::*;
pub use ops::{export_m3u, parse_m3u, playlist_stats};
pub use repository::Database;
pub use store::{DEFAULT_PREFIX, KvStore};
