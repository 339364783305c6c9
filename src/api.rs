//! Netease Cloud Music API module
//!
//! Public web endpoints used for online lyrics: song search and lyric lookup.

pub mod ncm_api;

pub use ncm_api::LyricsApi;
pub use ncm_api::model::{OnlineLyrics, RawLyrics, SongMatch};
