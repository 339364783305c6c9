//! Database repository - main entry point
//! Delegates to ops modules for actual operations

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::Mutex;

use super::store::{DEFAULT_PREFIX, KvStore};
use super::{models::*, ops};
use crate::features::Settings;

/// Storage handle shared across the app
///
/// Reads go straight to the store. Every read-modify-write holds `write_lock`
/// so concurrent updates to the same blob cannot interleave.
#[derive(Debug)]
pub struct Database {
    store: KvStore,
    write_lock: Mutex<()>,
}

impl Database {
    /// Open (or create) the data directory and seed missing collections
    pub async fn open(dir: &Path) -> Result<Self> {
        Self::open_with_prefix(dir, DEFAULT_PREFIX).await
    }

    pub async fn open_with_prefix(dir: &Path, prefix: &str) -> Result<Self> {
        let store = KvStore::open(dir, prefix).await?;

        if !store.contains(ops::KEY_LIBRARY).await {
            ops::set_library(&store, &[]).await?;
        }
        if !store.contains(ops::KEY_PLAYLISTS).await {
            ops::set_playlists(&store, &[]).await?;
        }
        if !store.contains(ops::KEY_FAVORITES).await {
            ops::set_favorites(&store, &[]).await?;
        }
        if !store.contains(ops::KEY_PLAYBACK_STATE).await {
            ops::set_playback_state(&store, &PlaybackState::default()).await?;
        }

        tracing::debug!("Database opened at {:?}", dir);
        Ok(Self {
            store,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    // ============ Song Operations ============

    pub async fn get_all_songs(&self) -> Result<Vec<Song>> {
        ops::get_all_songs(&self.store).await
    }

    pub async fn get_song_by_path(&self, path: &str) -> Result<Option<Song>> {
        ops::get_song_by_path(&self.store, path).await
    }

    pub async fn add_songs(&self, songs: Vec<Song>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        ops::add_songs(&self.store, songs).await
    }

    pub async fn remove_song(&self, path: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        ops::remove_song(&self.store, path).await
    }

    pub async fn update_song(&self, path: &str, update: SongUpdate) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        ops::update_song(&self.store, path, update).await
    }

    /// Fuzzy search the library and remember the query
    pub async fn search_songs(&self, query: &str) -> Result<Vec<Song>> {
        let songs = self.get_all_songs().await?;
        {
            let _guard = self.write_lock.lock().await;
            ops::add_to_search_history(&self.store, query).await?;
        }
        Ok(ops::filter_songs(&songs, query))
    }

    pub async fn sorted_songs(&self, sort_by: SortBy) -> Result<Vec<Song>> {
        let mut songs = self.get_all_songs().await?;
        ops::sort_songs(&mut songs, sort_by);
        Ok(songs)
    }

    pub async fn artists(&self) -> Result<Vec<ArtistSummary>> {
        Ok(ops::aggregate_artists(&self.get_all_songs().await?))
    }

    pub async fn albums(&self) -> Result<Vec<AlbumSummary>> {
        Ok(ops::aggregate_albums(&self.get_all_songs().await?))
    }

    pub async fn genres(&self) -> Result<Vec<GenreSummary>> {
        Ok(ops::aggregate_genres(&self.get_all_songs().await?))
    }

    // ============ Playlist Operations ============

    pub async fn get_playlists(&self) -> Result<Vec<Playlist>> {
        ops::get_playlists(&self.store).await
    }

    pub async fn get_playlist(&self, id: &str) -> Result<Option<Playlist>> {
        ops::get_playlist(&self.store, id).await
    }

    pub async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist> {
        let _guard = self.write_lock.lock().await;
        ops::create_playlist(&self.store, name, description, false).await
    }

    pub async fn delete_playlist(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        ops::delete_playlist(&self.store, id).await
    }

    pub async fn update_playlist(
        &self,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        ops::update_playlist(&self.store, id, name, description).await
    }

    pub async fn add_to_playlist(&self, id: &str, paths: &[String]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        ops::add_to_playlist(&self.store, id, paths).await
    }

    pub async fn remove_from_playlist(&self, id: &str, path: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        ops::remove_from_playlist(&self.store, id, path).await
    }

    /// Songs of a playlist resolved against the library, in playlist order
    ///
    /// Paths no longer in the library are skipped.
    pub async fn playlist_songs(&self, id: &str) -> Result<Vec<Song>> {
        let Some(playlist) = self.get_playlist(id).await? else {
            return Ok(Vec::new());
        };
        let library = self.get_all_songs().await?;
        Ok(playlist
            .songs
            .iter()
            .filter_map(|path| library.iter().find(|s| &s.path == path).cloned())
            .collect())
    }

    pub async fn playlist_stats(&self, id: &str) -> Result<Option<PlaylistStats>> {
        if self.get_playlist(id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(ops::playlist_stats(&self.playlist_songs(id).await?)))
    }

    /// Create a playlist from every library song matching `predicate`
    ///
    /// Returns `None` without creating anything when no song matches.
    pub async fn create_smart_playlist<F>(&self, name: &str, predicate: F) -> Result<Option<Playlist>>
    where
        F: Fn(&Song) -> bool,
    {
        let paths: Vec<String> = self
            .get_all_songs()
            .await?
            .into_iter()
            .filter(|s| predicate(s))
            .map(|s| s.path)
            .collect();

        if paths.is_empty() {
            tracing::info!("Smart playlist '{}' matched no songs", name);
            return Ok(None);
        }

        let _guard = self.write_lock.lock().await;
        let description = format!("Smart playlist - {} songs", paths.len());
        let mut playlist = ops::create_playlist(&self.store, name, &description, true).await?;
        ops::add_to_playlist(&self.store, &playlist.id, &paths).await?;
        playlist.songs = paths;
        Ok(Some(playlist))
    }

    pub async fn export_playlist(&self, id: &str, format: PlaylistFormat) -> Result<Option<String>> {
        let Some(playlist) = self.get_playlist(id).await? else {
            return Ok(None);
        };
        let content = match format {
            PlaylistFormat::M3u => ops::export_m3u(&self.playlist_songs(id).await?),
            PlaylistFormat::Json => ops::export_json(&playlist)?,
        };
        Ok(Some(content))
    }

    /// Create a playlist from M3U or JSON content
    ///
    /// Only paths already in the library are kept. Returns `None` when none
    /// of them are.
    pub async fn import_playlist(
        &self,
        content: &str,
        format: PlaylistFormat,
    ) -> Result<Option<Playlist>> {
        let (name, description, paths) = match format {
            PlaylistFormat::M3u => (None, None, ops::parse_m3u(content)),
            PlaylistFormat::Json => {
                let file = ops::parse_json_playlist(content)?;
                (file.name, file.description, file.songs)
            }
        };

        let library: HashSet<String> = self
            .get_all_songs()
            .await?
            .into_iter()
            .map(|s| s.path)
            .collect();
        let valid: Vec<String> = paths.into_iter().filter(|p| library.contains(p)).collect();

        if valid.is_empty() {
            tracing::warn!("Imported playlist has no songs present in the library");
            return Ok(None);
        }

        let _guard = self.write_lock.lock().await;
        let name = name.unwrap_or_else(|| "Imported Playlist".to_string());
        let mut playlist =
            ops::create_playlist(&self.store, &name, description.as_deref().unwrap_or(""), false)
                .await?;
        ops::add_to_playlist(&self.store, &playlist.id, &valid).await?;
        playlist.songs = valid;
        Ok(Some(playlist))
    }

    // ============ Favorites ============

    pub async fn get_favorites(&self) -> Result<Vec<String>> {
        ops::get_favorites(&self.store).await
    }

    pub async fn is_favorite(&self, path: &str) -> Result<bool> {
        ops::is_favorite(&self.store, path).await
    }

    pub async fn add_favorite(&self, path: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        ops::add_favorite(&self.store, path).await
    }

    pub async fn remove_favorite(&self, path: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        ops::remove_favorite(&self.store, path).await
    }

    pub async fn toggle_favorite(&self, path: &str) -> Result<FavoriteToggle> {
        let _guard = self.write_lock.lock().await;
        ops::toggle_favorite(&self.store, path).await
    }

    // ============ Playback State Operations ============

    pub async fn get_playback_state(&self) -> Result<PlaybackState> {
        ops::get_playback_state(&self.store).await
    }

    pub async fn update_playback_state<F>(&self, f: F) -> Result<PlaybackState>
    where
        F: FnOnce(&mut PlaybackState),
    {
        let _guard = self.write_lock.lock().await;
        ops::update_playback_state(&self.store, f).await
    }

    // ============ Search History ============

    pub async fn get_search_history(&self) -> Result<Vec<String>> {
        ops::get_search_history(&self.store).await
    }

    pub async fn clear_search_history(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        ops::clear_search_history(&self.store).await
    }

    // ============ Stats ============

    pub async fn get_stats(&self) -> Result<Stats> {
        ops::get_stats(&self.store).await
    }

    pub async fn increment_play_count(&self, path: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        ops::increment_play_count(&self.store, path).await
    }

    pub async fn add_play_time(&self, secs: f64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        ops::add_play_time(&self.store, secs).await
    }

    // ============ Backup & Maintenance ============

    pub async fn export_data(&self, settings: &Settings) -> Result<ExportData> {
        Ok(ExportData {
            library: Some(self.get_all_songs().await?),
            playlists: Some(self.get_playlists().await?),
            favorites: Some(self.get_favorites().await?),
            settings: Some(settings.clone()),
            stats: Some(self.get_stats().await?),
            export_time: ops::current_timestamp(),
            version: EXPORT_VERSION.to_string(),
        })
    }

    /// Replace every section present in `data`
    ///
    /// Settings are handed back to the caller, which owns the settings file.
    pub async fn import_data(&self, data: ExportData) -> Result<Option<Settings>> {
        if !data.version.is_empty() && data.version != EXPORT_VERSION {
            tracing::warn!(
                "Importing backup version {} (expected {})",
                data.version,
                EXPORT_VERSION
            );
        }

        let _guard = self.write_lock.lock().await;
        if let Some(library) = &data.library {
            ops::set_library(&self.store, library).await?;
        }
        if let Some(playlists) = &data.playlists {
            ops::set_playlists(&self.store, playlists).await?;
        }
        if let Some(favorites) = &data.favorites {
            ops::set_favorites(&self.store, favorites).await?;
        }
        if let Some(stats) = &data.stats {
            ops::set_stats(&self.store, stats).await?;
        }
        Ok(data.settings)
    }

    /// Drop library entries whose files are gone, and prune them everywhere
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let _guard = self.write_lock.lock().await;
        let library = ops::get_all_songs(&self.store).await?;

        let mut valid = Vec::with_capacity(library.len());
        for song in &library {
            if tokio::fs::try_exists(&song.path).await.unwrap_or(false) {
                valid.push(song.clone());
            } else {
                tracing::debug!("Missing file removed from library: {}", song.path);
            }
        }
        let valid_paths: HashSet<&str> = valid.iter().map(|s| s.path.as_str()).collect();

        let mut playlists = ops::get_playlists(&self.store).await?;
        for playlist in &mut playlists {
            playlist.songs.retain(|p| valid_paths.contains(p.as_str()));
        }
        ops::set_playlists(&self.store, &playlists).await?;

        let mut favorites = ops::get_favorites(&self.store).await?;
        favorites.retain(|p| valid_paths.contains(p.as_str()));
        ops::set_favorites(&self.store, &favorites).await?;

        let report = CleanupReport {
            removed_songs: library.len() - valid.len(),
            total_songs: valid.len(),
        };
        ops::set_library(&self.store, &valid)
            .await
            .context("Failed to save cleaned library")?;

        tracing::info!(
            "Cleanup removed {} songs, {} remain",
            report.removed_songs,
            report.total_songs
        );
        Ok(report)
    }

    /// Bytes used on disk by this database
    pub async fn storage_size(&self) -> Result<u64> {
        self.store.storage_size().await
    }

    /// Remove every stored collection
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.clear().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).await.unwrap();
        (dir, db)
    }

    fn song(path: &str, artist: &str, genre: &str) -> Song {
        Song {
            artist: artist.into(),
            genre: genre.into(),
            ..Song::new(path)
        }
    }

    #[tokio::test]
    async fn test_open_seeds_collections() {
        let (dir, db) = open_temp().await;
        assert!(dir.path().join("mymusic_library.json").exists());
        assert!(dir.path().join("mymusic_playbackState.json").exists());
        assert!(db.get_all_songs().await.unwrap().is_empty());
        assert!(db.storage_size().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_search_records_history() {
        let (_dir, db) = open_temp().await;
        db.add_songs(vec![song("/a", "Adele", "Pop")]).await.unwrap();
        assert_eq!(db.search_songs("adl").await.unwrap().len(), 1);
        assert_eq!(db.get_search_history().await.unwrap(), vec!["adl"]);
    }

    #[tokio::test]
    async fn test_smart_playlist() {
        let (_dir, db) = open_temp().await;
        db.add_songs(vec![song("/a", "A", "Rock"), song("/b", "B", "Jazz")])
            .await
            .unwrap();

        let playlist = db
            .create_smart_playlist("Rock", |s| s.genre == "Rock")
            .await
            .unwrap()
            .unwrap();
        assert!(playlist.is_smart);
        assert_eq!(playlist.songs, vec!["/a".to_string()]);

        let none = db.create_smart_playlist("Metal", |s| s.genre == "Metal").await.unwrap();
        assert!(none.is_none());
        assert_eq!(db.get_playlists().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_playlist_keeps_known_paths() {
        let (_dir, db) = open_temp().await;
        db.add_songs(vec![Song::new("/a"), Song::new("/b")]).await.unwrap();

        let m3u = "#EXTM3U\n#EXTINF:1,x - y\n/a\n/unknown\n/b\n";
        let playlist = db
            .import_playlist(m3u, PlaylistFormat::M3u)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(playlist.songs, vec!["/a".to_string(), "/b".to_string()]);

        let exported = db
            .export_playlist(&playlist.id, PlaylistFormat::M3u)
            .await
            .unwrap()
            .unwrap();
        assert!(exported.starts_with("#EXTM3U\n"));
        assert!(exported.contains("\n/a\n"));

        let nothing = db.import_playlist("/nope\n", PlaylistFormat::M3u).await.unwrap();
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn test_export_import_data() {
        let (_dir, db) = open_temp().await;
        db.add_songs(vec![Song::new("/a")]).await.unwrap();
        db.add_favorite("/a").await.unwrap();

        let data = db.export_data(&Settings::default()).await.unwrap();
        assert_eq!(data.version, EXPORT_VERSION);

        let (_dir2, other) = open_temp().await;
        let settings = other.import_data(data).await.unwrap();
        assert!(settings.is_some());
        assert_eq!(other.get_all_songs().await.unwrap().len(), 1);
        assert!(other.is_favorite("/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_import_data_partial_sections() {
        let (_dir, db) = open_temp().await;
        db.add_songs(vec![Song::new("/keep")]).await.unwrap();

        let data: ExportData = serde_json::from_str(r#"{"favorites":["/x"]}"#).unwrap();
        db.import_data(data).await.unwrap();
        assert_eq!(db.get_all_songs().await.unwrap().len(), 1);
        assert_eq!(db.get_favorites().await.unwrap(), vec!["/x"]);
    }

    #[tokio::test]
    async fn test_cleanup_prunes_missing_files() {
        let (dir, db) = open_temp().await;
        let existing = dir.path().join("real.mp3");
        std::fs::write(&existing, b"x").unwrap();
        let existing = existing.to_string_lossy().to_string();

        db.add_songs(vec![Song::new(existing.clone()), Song::new("/gone.mp3")])
            .await
            .unwrap();
        let playlist = db.create_playlist("p", "").await.unwrap();
        db.add_to_playlist(&playlist.id, &[existing.clone(), "/gone.mp3".into()])
            .await
            .unwrap();
        db.add_favorite("/gone.mp3").await.unwrap();

        let report = db.cleanup().await.unwrap();
        assert_eq!(report, CleanupReport { removed_songs: 1, total_songs: 1 });
        assert_eq!(db.playlist_songs(&playlist.id).await.unwrap().len(), 1);
        assert_eq!(
            db.get_playlist(&playlist.id).await.unwrap().unwrap().songs,
            vec![existing]
        );
        assert!(db.get_favorites().await.unwrap().is_empty());
    }
}
