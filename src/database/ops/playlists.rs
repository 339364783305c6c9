//! Playlist operations

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{KEY_PLAYLISTS, current_timestamp};
use crate::database::{KvStore, Playlist, PlaylistStats, Song};
use crate::utils::generate_id;

/// Get all playlists in creation order
pub async fn get_playlists(store: &KvStore) -> Result<Vec<Playlist>> {
    Ok(store.get(KEY_PLAYLISTS).await.unwrap_or_default())
}

pub async fn set_playlists(store: &KvStore, playlists: &[Playlist]) -> Result<()> {
    store.set(KEY_PLAYLISTS, playlists).await
}

pub async fn get_playlist(store: &KvStore, id: &str) -> Result<Option<Playlist>> {
    Ok(get_playlists(store)
        .await?
        .into_iter()
        .find(|p| p.id == id))
}

/// Create a new playlist
pub async fn create_playlist(
    store: &KvStore,
    name: &str,
    description: &str,
    is_smart: bool,
) -> Result<Playlist> {
    let now = current_timestamp();
    let playlist = Playlist {
        id: generate_id(),
        name: name.to_string(),
        description: description.to_string(),
        songs: Vec::new(),
        is_smart,
        created_at: now,
        updated_at: now,
    };

    let mut playlists = get_playlists(store).await?;
    playlists.push(playlist.clone());
    set_playlists(store, &playlists).await?;
    Ok(playlist)
}

pub async fn delete_playlist(store: &KvStore, id: &str) -> Result<bool> {
    let mut playlists = get_playlists(store).await?;
    let before = playlists.len();
    playlists.retain(|p| p.id != id);
    if playlists.len() == before {
        return Ok(false);
    }
    set_playlists(store, &playlists).await?;
    Ok(true)
}

/// Rename or re-describe a playlist
pub async fn update_playlist(
    store: &KvStore,
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<bool> {
    let mut playlists = get_playlists(store).await?;
    let Some(playlist) = playlists.iter_mut().find(|p| p.id == id) else {
        return Ok(false);
    };
    if let Some(name) = name {
        playlist.name = name.to_string();
    }
    if let Some(description) = description {
        playlist.description = description.to_string();
    }
    playlist.updated_at = current_timestamp();
    set_playlists(store, &playlists).await?;
    Ok(true)
}

/// Append paths not already in the playlist, returns the count added
pub async fn add_to_playlist(store: &KvStore, id: &str, paths: &[String]) -> Result<usize> {
    let mut playlists = get_playlists(store).await?;
    let Some(playlist) = playlists.iter_mut().find(|p| p.id == id) else {
        return Ok(0);
    };

    let mut existing: HashSet<String> = playlist.songs.iter().cloned().collect();
    let before = playlist.songs.len();
    for path in paths {
        if existing.insert(path.clone()) {
            playlist.songs.push(path.clone());
        }
    }

    let added = playlist.songs.len() - before;
    if added > 0 {
        playlist.updated_at = current_timestamp();
        set_playlists(store, &playlists).await?;
    }
    Ok(added)
}

pub async fn remove_from_playlist(store: &KvStore, id: &str, path: &str) -> Result<bool> {
    let mut playlists = get_playlists(store).await?;
    let Some(playlist) = playlists.iter_mut().find(|p| p.id == id) else {
        return Ok(false);
    };
    let before = playlist.songs.len();
    playlist.songs.retain(|p| p != path);
    if playlist.songs.len() == before {
        return Ok(false);
    }
    playlist.updated_at = current_timestamp();
    set_playlists(store, &playlists).await?;
    Ok(true)
}

/// Summary numbers over the resolved songs of a playlist
pub fn playlist_stats(songs: &[Song]) -> PlaylistStats {
    let total_duration: u64 = songs.iter().map(|s| s.duration_secs).sum();
    let artists: HashSet<&str> = songs.iter().map(|s| s.artist.as_str()).collect();
    let albums: HashSet<&str> = songs.iter().map(|s| s.album.as_str()).collect();

    PlaylistStats {
        song_count: songs.len(),
        total_duration,
        average_duration: if songs.is_empty() {
            0
        } else {
            total_duration / songs.len() as u64
        },
        artist_count: artists.len(),
        album_count: albums.len(),
    }
}

/// Render resolved songs as extended M3U
pub fn export_m3u(songs: &[Song]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for song in songs {
        out.push_str(&format!(
            "#EXTINF:{},{} - {}\n{}\n",
            song.duration_secs, song.artist, song.title, song.path
        ));
    }
    out
}

/// Extract song paths from M3U content, ignoring comments and directives
pub fn parse_m3u(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// JSON playlist file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub songs: Vec<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub exported_at: Option<i64>,
}

pub fn export_json(playlist: &Playlist) -> Result<String> {
    let file = PlaylistFile {
        name: Some(playlist.name.clone()),
        description: Some(playlist.description.clone()),
        songs: playlist.songs.clone(),
        created_at: Some(playlist.created_at),
        exported_at: Some(current_timestamp()),
    };
    serde_json::to_string_pretty(&file).context("Failed to serialize playlist")
}

pub fn parse_json_playlist(content: &str) -> Result<PlaylistFile> {
    serde_json::from_str(content).context("Invalid playlist JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_m3u() {
        let song = Song {
            title: "Title".into(),
            artist: "Artist".into(),
            duration_secs: 181,
            ..Song::new("/music/a.mp3")
        };
        assert_eq!(
            export_m3u(&[song]),
            "#EXTM3U\n#EXTINF:181,Artist - Title\n/music/a.mp3\n"
        );
    }

    #[test]
    fn test_parse_m3u() {
        let content = "#EXTM3U\n#EXTINF:181,A - T\n/music/a.mp3\n\n  /music/b.flac  \r\n# comment";
        assert_eq!(parse_m3u(content), vec!["/music/a.mp3", "/music/b.flac"]);
    }

    #[test]
    fn test_playlist_stats() {
        let songs = vec![
            Song { artist: "A".into(), album: "X".into(), duration_secs: 100, ..Song::new("/1") },
            Song { artist: "A".into(), album: "Y".into(), duration_secs: 200, ..Song::new("/2") },
        ];
        let stats = playlist_stats(&songs);
        assert_eq!(stats.song_count, 2);
        assert_eq!(stats.total_duration, 300);
        assert_eq!(stats.average_duration, 150);
        assert_eq!(stats.artist_count, 1);
        assert_eq!(stats.album_count, 2);
        assert_eq!(playlist_stats(&[]).average_duration, 0);
    }

    #[tokio::test]
    async fn test_playlist_crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), "t_").await.unwrap();

        let playlist = create_playlist(&store, "Mix", "", false).await.unwrap();
        let paths = vec!["/a".to_string(), "/b".to_string(), "/a".to_string()];
        assert_eq!(add_to_playlist(&store, &playlist.id, &paths).await.unwrap(), 2);
        assert_eq!(add_to_playlist(&store, "nope", &paths).await.unwrap(), 0);

        assert!(remove_from_playlist(&store, &playlist.id, "/a").await.unwrap());
        assert!(!remove_from_playlist(&store, &playlist.id, "/a").await.unwrap());

        assert!(update_playlist(&store, &playlist.id, Some("Renamed"), None).await.unwrap());
        let stored = get_playlist(&store, &playlist.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.songs, vec!["/b".to_string()]);
        assert!(stored.updated_at >= stored.created_at);

        assert!(delete_playlist(&store, &playlist.id).await.unwrap());
        assert!(get_playlists(&store).await.unwrap().is_empty());
    }

    #[test]
    fn test_json_playlist_round_trip() {
        let playlist = Playlist {
            id: "x".into(),
            name: "Road".into(),
            description: "d".into(),
            songs: vec!["/a".into()],
            is_smart: false,
            created_at: 1,
            updated_at: 1,
        };
        let parsed = parse_json_playlist(&export_json(&playlist).unwrap()).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Road"));
        assert_eq!(parsed.songs, vec!["/a".to_string()]);
    }
}
