//! Library operations

use anyhow::Result;
use std::collections::{BTreeMap, HashSet};

use super::KEY_LIBRARY;
use crate::database::{
    AlbumSummary, ArtistSummary, GenreSummary, KvStore, Song, SongUpdate, SortBy,
};
use crate::utils::fuzzy_match;

/// Get all songs in insertion order
pub async fn get_all_songs(store: &KvStore) -> Result<Vec<Song>> {
    Ok(store.get(KEY_LIBRARY).await.unwrap_or_default())
}

pub async fn set_library(store: &KvStore, songs: &[Song]) -> Result<()> {
    store.set(KEY_LIBRARY, songs).await
}

/// Get song by file path
pub async fn get_song_by_path(store: &KvStore, path: &str) -> Result<Option<Song>> {
    Ok(get_all_songs(store)
        .await?
        .into_iter()
        .find(|s| s.path == path))
}

/// Add songs whose path is not yet in the library, returns the count added
pub async fn add_songs(store: &KvStore, songs: Vec<Song>) -> Result<usize> {
    let mut library = get_all_songs(store).await?;
    let mut existing: HashSet<String> = library.iter().map(|s| s.path.clone()).collect();

    let before = library.len();
    for song in songs {
        if existing.insert(song.path.clone()) {
            library.push(song);
        }
    }

    let added = library.len() - before;
    if added > 0 {
        set_library(store, &library).await?;
    }
    Ok(added)
}

/// Remove song by file path, returns whether it existed
pub async fn remove_song(store: &KvStore, path: &str) -> Result<bool> {
    let mut library = get_all_songs(store).await?;
    let before = library.len();
    library.retain(|s| s.path != path);
    if library.len() == before {
        return Ok(false);
    }
    set_library(store, &library).await?;
    Ok(true)
}

/// Merge a partial update into the song at `path`
pub async fn update_song(store: &KvStore, path: &str, update: SongUpdate) -> Result<bool> {
    let mut library = get_all_songs(store).await?;
    let Some(song) = library.iter_mut().find(|s| s.path == path) else {
        return Ok(false);
    };
    update.apply(song);
    set_library(store, &library).await?;
    Ok(true)
}

/// Fuzzy search over title, artist, album and genre
pub fn filter_songs(songs: &[Song], query: &str) -> Vec<Song> {
    let query = query.trim();
    if query.is_empty() {
        return songs.to_vec();
    }
    songs
        .iter()
        .filter(|s| {
            fuzzy_match(query, &s.title)
                || fuzzy_match(query, &s.artist)
                || fuzzy_match(query, &s.album)
                || fuzzy_match(query, &s.genre)
        })
        .cloned()
        .collect()
}

fn lower(s: &str) -> String {
    s.to_lowercase()
}

/// Sort songs in place
pub fn sort_songs(songs: &mut [Song], sort_by: SortBy) {
    match sort_by {
        SortBy::Title => songs.sort_by_key(|s| lower(&s.title)),
        SortBy::Artist => songs.sort_by(|a, b| {
            lower(&a.artist)
                .cmp(&lower(&b.artist))
                .then_with(|| lower(&a.title).cmp(&lower(&b.title)))
        }),
        SortBy::Album => songs.sort_by(|a, b| {
            lower(&a.album)
                .cmp(&lower(&b.album))
                .then_with(|| a.track.unwrap_or(0).cmp(&b.track.unwrap_or(0)))
        }),
        SortBy::Duration => songs.sort_by(|a, b| b.duration_secs.cmp(&a.duration_secs)),
        SortBy::DateAdded => songs.sort_by(|a, b| b.date_added.cmp(&a.date_added)),
    }
}

/// Per-artist counts, sorted by name
pub fn aggregate_artists(songs: &[Song]) -> Vec<ArtistSummary> {
    let mut map: BTreeMap<&str, (usize, HashSet<&str>, u64)> = BTreeMap::new();
    for song in songs {
        let entry = map.entry(song.artist.as_str()).or_default();
        entry.0 += 1;
        entry.1.insert(song.album.as_str());
        entry.2 += song.duration_secs;
    }
    map.into_iter()
        .map(|(name, (song_count, albums, total_duration))| ArtistSummary {
            name: name.to_string(),
            song_count,
            album_count: albums.len(),
            total_duration,
        })
        .collect()
}

/// Per-album counts keyed by (artist, album), sorted
pub fn aggregate_albums(songs: &[Song]) -> Vec<AlbumSummary> {
    let mut map: BTreeMap<(&str, &str), AlbumSummary> = BTreeMap::new();
    for song in songs {
        let entry = map
            .entry((song.artist.as_str(), song.album.as_str()))
            .or_insert_with(|| AlbumSummary {
                title: song.album.clone(),
                artist: song.artist.clone(),
                year: song.year,
                song_count: 0,
                total_duration: 0,
            });
        entry.song_count += 1;
        entry.total_duration += song.duration_secs;
        if entry.year.is_none() {
            entry.year = song.year;
        }
    }
    map.into_values().collect()
}

/// Per-genre counts, sorted by name
pub fn aggregate_genres(songs: &[Song]) -> Vec<GenreSummary> {
    let mut map: BTreeMap<&str, (usize, HashSet<&str>, u64)> = BTreeMap::new();
    for song in songs {
        let entry = map.entry(song.genre.as_str()).or_default();
        entry.0 += 1;
        entry.1.insert(song.artist.as_str());
        entry.2 += song.duration_secs;
    }
    map.into_iter()
        .map(|(name, (song_count, artists, total_duration))| GenreSummary {
            name: name.to_string(),
            song_count,
            artist_count: artists.len(),
            total_duration,
        })
        .collect()
}
