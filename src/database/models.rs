//! Persisted models
//! Each top-level collection is stored as one JSON blob keyed by name

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::features::PlayMode;

/// Song metadata stored in the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Song {
    /// Stable identifier derived from the file path
    pub id: String,
    /// File path on disk, unique within the library
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub year: Option<u32>,
    pub genre: String,
    pub track: Option<u32>,
    pub track_total: Option<u32>,
    pub disc: Option<u32>,
    pub disc_total: Option<u32>,
    /// Duration in whole seconds
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    /// Bitrate in kbps
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub codec: Option<String>,
    pub container: Option<String>,
    /// File size in bytes
    pub file_size: u64,
    /// Partial content hash for deduplication
    pub file_hash: Option<String>,
    /// Upper-case extension (MP3, FLAC, ...)
    pub format: String,
    /// Unix millis
    pub date_added: i64,
    /// Unix millis
    pub date_modified: i64,
    pub play_count: u64,
    pub last_played: Option<i64>,
    pub rating: u8,
    /// Raw LRC text
    pub lyrics: Option<String>,
    /// Raw LRC translation text
    pub translated_lyrics: Option<String>,
    pub comment: Option<String>,
    pub composer: Option<String>,
    /// Matched online song, set when lyrics were fetched online
    pub online_song_info: Option<OnlineSongInfo>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            id: String::new(),
            path: String::new(),
            title: UNKNOWN_TITLE.to_string(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            album_artist: UNKNOWN_ARTIST.to_string(),
            year: None,
            genre: UNKNOWN_GENRE.to_string(),
            track: None,
            track_total: None,
            disc: None,
            disc_total: None,
            duration_secs: 0,
            bitrate: None,
            sample_rate: None,
            codec: None,
            container: None,
            file_size: 0,
            file_hash: None,
            format: String::new(),
            date_added: 0,
            date_modified: 0,
            play_count: 0,
            last_played: None,
            rating: 0,
            lyrics: None,
            translated_lyrics: None,
            comment: None,
            composer: None,
            online_song_info: None,
        }
    }
}

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown";

impl Song {
    /// Create a song record for `path` with default metadata
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: song_id_for_path(&path),
            path,
            ..Default::default()
        }
    }

    pub fn has_lyrics(&self) -> bool {
        self.lyrics.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// Derive a song id from its path
pub fn song_id_for_path(path: &str) -> String {
    format!("{:016x}", xxh3_64(path.as_bytes()))
}

/// Partial update merged over an existing song
#[derive(Debug, Clone, Default)]
pub struct SongUpdate {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<u8>,
    pub lyrics: Option<String>,
    pub translated_lyrics: Option<String>,
    pub online_song_info: Option<OnlineSongInfo>,
    pub play_count: Option<u64>,
    pub last_played: Option<i64>,
}

impl SongUpdate {
    pub fn apply(self, song: &mut Song) {
        if let Some(v) = self.title {
            song.title = v;
        }
        if let Some(v) = self.artist {
            song.artist = v;
        }
        if let Some(v) = self.album {
            song.album = v;
        }
        if let Some(v) = self.genre {
            song.genre = v;
        }
        if let Some(v) = self.rating {
            song.rating = v;
        }
        if let Some(v) = self.lyrics {
            song.lyrics = Some(v);
        }
        if let Some(v) = self.translated_lyrics {
            song.translated_lyrics = Some(v);
        }
        if let Some(v) = self.online_song_info {
            song.online_song_info = Some(v);
        }
        if let Some(v) = self.play_count {
            song.play_count = v;
        }
        if let Some(v) = self.last_played {
            song.last_played = Some(v);
        }
    }
}

/// Song matched on the online lyrics service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineSongInfo {
    pub id: u64,
    pub name: String,
    pub artist: String,
    pub album: String,
    /// Duration in milliseconds
    pub duration: u64,
}

/// User playlist; songs are referenced by path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub songs: Vec<String>,
    #[serde(default)]
    pub is_smart: bool,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis
    pub updated_at: i64,
}

/// Saved playback state for resuming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackState {
    /// Path of the current song
    pub current_song: Option<String>,
    /// Position in seconds
    pub current_time: f64,
    pub is_playing: bool,
    /// Queue as song paths
    pub queue: Vec<String>,
    pub current_index: Option<usize>,
    /// Previously played song paths, newest last
    pub history: Vec<String>,
    pub volume: f64,
    pub play_mode: PlayMode,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_song: None,
            current_time: 0.0,
            is_playing: false,
            queue: Vec::new(),
            current_index: None,
            history: Vec::new(),
            volume: 0.5,
            play_mode: PlayMode::default(),
        }
    }
}

/// Global listening statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// Seconds
    pub total_play_time: f64,
    pub songs_played: u64,
    pub favorite_genre: Option<String>,
    pub favorite_artist: Option<String>,
    /// Unix millis
    pub last_played: Option<i64>,
}

/// Full backup of user data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    #[serde(default)]
    pub library: Option<Vec<Song>>,
    #[serde(default)]
    pub playlists: Option<Vec<Playlist>>,
    #[serde(default)]
    pub favorites: Option<Vec<String>>,
    #[serde(default)]
    pub settings: Option<crate::features::Settings>,
    #[serde(default)]
    pub stats: Option<Stats>,
    #[serde(default)]
    pub export_time: i64,
    #[serde(default)]
    pub version: String,
}

pub const EXPORT_VERSION: &str = "1.0.0";

/// Aggregated playlist numbers
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistStats {
    pub song_count: usize,
    pub total_duration: u64,
    pub average_duration: u64,
    pub artist_count: usize,
    pub album_count: usize,
}

/// Result of removing missing files from the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupReport {
    pub removed_songs: usize,
    pub total_songs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSummary {
    pub name: String,
    pub song_count: usize,
    pub album_count: usize,
    pub total_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumSummary {
    pub title: String,
    pub artist: String,
    pub year: Option<u32>,
    pub song_count: usize,
    pub total_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreSummary {
    pub name: String,
    pub song_count: usize,
    pub artist_count: usize,
    pub total_duration: u64,
}

/// Library sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Title,
    Artist,
    Album,
    /// Longest first
    Duration,
    /// Newest first
    DateAdded,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "title" => Ok(SortBy::Title),
            "artist" => Ok(SortBy::Artist),
            "album" => Ok(SortBy::Album),
            "duration" => Ok(SortBy::Duration),
            "dateadded" | "date-added" | "date_added" | "added" => Ok(SortBy::DateAdded),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Playlist file format for export and import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistFormat {
    M3u,
    Json,
}

impl PlaylistFormat {
    pub fn extension(self) -> &'static str {
        match self {
            PlaylistFormat::M3u => "m3u",
            PlaylistFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for PlaylistFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "m3u" | "m3u8" => Ok(PlaylistFormat::M3u),
            "json" => Ok(PlaylistFormat::Json),
            other => Err(format!("unknown playlist format: {}", other)),
        }
    }
}

/// Outcome of toggling a favorite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}
