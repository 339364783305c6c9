//! Lyrics resolution and the on-disk online lyrics cache
//!
//! Order of lookup: library record, cache, local files, then the online API.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{LyricTrack, build_track_with_translation};
use crate::api::{LyricsApi, SongMatch};
use crate::database::{Database, Song, SongUpdate};
use crate::features::Settings;
use crate::features::media::{LyricsOrigin, find_lyrics};

/// Lyrics cache directory
pub fn lyrics_cache_dir() -> PathBuf {
    crate::utils::cache_dir().join("lyrics")
}

/// Get cached lyrics file path for a song
fn get_cache_path(cache_dir: &Path, song_id: &str, suffix: &str) -> PathBuf {
    cache_dir.join(format!("{}{}", song_id, suffix))
}

/// Check if lyrics are cached
pub fn is_lyrics_cached(cache_dir: &Path, song_id: &str) -> bool {
    get_cache_path(cache_dir, song_id, ".lrc").exists()
}

/// Load cached lyrics as `(lyric, translation)`
pub fn load_cached_lyrics(cache_dir: &Path, song_id: &str) -> Option<(String, Option<String>)> {
    let lyric = std::fs::read_to_string(get_cache_path(cache_dir, song_id, ".lrc")).ok()?;
    if lyric.trim().is_empty() {
        return None;
    }

    let translation = std::fs::read_to_string(get_cache_path(cache_dir, song_id, ".tlrc"))
        .ok()
        .filter(|t| !t.trim().is_empty());

    Some((lyric, translation))
}

/// Save lyrics to cache
pub fn save_lyrics_cache(
    cache_dir: &Path,
    song_id: &str,
    lyric: &str,
    translation: Option<&str>,
) -> Result<()> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create {:?}", cache_dir))?;

    std::fs::write(get_cache_path(cache_dir, song_id, ".lrc"), lyric)?;

    if let Some(trans) = translation.filter(|t| !t.is_empty()) {
        std::fs::write(get_cache_path(cache_dir, song_id, ".tlrc"), trans)?;
    }

    Ok(())
}

/// Where resolved lyrics came from
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsSource {
    /// Stored on the song record
    Library,
    /// On-disk cache of an earlier online fetch
    Cache,
    /// Sidecar file or embedded tag
    Local(LyricsOrigin),
    /// Fetched just now
    Online(SongMatch),
}

/// Raw lyric text for a song
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLyrics {
    pub raw: String,
    pub translation: Option<String>,
    pub source: LyricsSource,
}

impl ResolvedLyrics {
    /// Build the track, merging the translation when requested
    pub fn to_track(&self, with_translation: bool) -> LyricTrack {
        let translation = if with_translation {
            self.translation.as_deref()
        } else {
            None
        };
        build_track_with_translation(&self.raw, translation)
    }
}

fn non_blank(text: Option<&String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).cloned()
}

/// Find lyrics for a song
///
/// Online lookup only runs when `api` is given and auto-fetch is enabled.
/// A failed fetch is logged and resolves to `None`.
pub async fn resolve_lyrics(
    db: &Database,
    api: Option<&LyricsApi>,
    song: &Song,
    settings: &Settings,
    cache_dir: &Path,
) -> Result<Option<ResolvedLyrics>> {
    if let Some(raw) = non_blank(song.lyrics.as_ref()) {
        return Ok(Some(ResolvedLyrics {
            raw,
            translation: non_blank(song.translated_lyrics.as_ref()),
            source: LyricsSource::Library,
        }));
    }

    if settings.lyrics.cache_enabled {
        if let Some((raw, translation)) = load_cached_lyrics(cache_dir, &song.id) {
            tracing::debug!("Loaded cached lyrics for {}", song.path);
            return Ok(Some(ResolvedLyrics {
                raw,
                translation,
                source: LyricsSource::Cache,
            }));
        }
    }

    let audio_path = PathBuf::from(&song.path);
    let local = tokio::task::spawn_blocking(move || find_lyrics(&audio_path))
        .await
        .context("Lyrics lookup task failed")?;
    if let Some(found) = local {
        return Ok(Some(ResolvedLyrics {
            raw: found.raw,
            translation: None,
            source: LyricsSource::Local(found.origin),
        }));
    }

    let Some(api) = api.filter(|_| settings.lyrics.auto_fetch) else {
        return Ok(None);
    };

    let artist = Some(song.artist.as_str()).filter(|a| *a != crate::database::UNKNOWN_ARTIST);
    let online = match api.auto_search_lyrics(&song.title, artist).await {
        Ok(online) => online,
        Err(e) => {
            tracing::warn!("Online lyrics lookup failed for {}: {:#}", song.path, e);
            return Ok(None);
        }
    };

    let raw = online.lyrics.lyric;
    let translation = online.lyrics.translated;

    if settings.lyrics.cache_enabled {
        if let Err(e) = save_lyrics_cache(cache_dir, &song.id, &raw, translation.as_deref()) {
            tracing::warn!("Failed to cache lyrics: {}", e);
        }
    }

    let update = SongUpdate {
        lyrics: Some(raw.clone()),
        translated_lyrics: translation.clone(),
        online_song_info: Some(online.song.clone().into()),
        ..Default::default()
    };
    if !db.update_song(&song.path, update).await? {
        tracing::debug!("{} is not in the library, lyrics not stored", song.path);
    }

    Ok(Some(ResolvedLyrics {
        raw,
        translation,
        source: LyricsSource::Online(online.song),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lyrics_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("lyrics");

        assert!(!is_lyrics_cached(&cache, "abc"));
        assert!(load_cached_lyrics(&cache, "abc").is_none());

        save_lyrics_cache(&cache, "abc", "[00:01.00]Hi", Some("[00:01.00]嗨")).unwrap();
        assert!(is_lyrics_cached(&cache, "abc"));
        assert_eq!(
            load_cached_lyrics(&cache, "abc"),
            Some(("[00:01.00]Hi".to_string(), Some("[00:01.00]嗨".to_string())))
        );

        save_lyrics_cache(&cache, "def", "[00:01.00]Solo", Some("")).unwrap();
        assert_eq!(
            load_cached_lyrics(&cache, "def"),
            Some(("[00:01.00]Solo".to_string(), None))
        );
    }

    #[test]
    fn test_resolved_to_track() {
        let resolved = ResolvedLyrics {
            raw: "[00:01.00]Hello\n[00:03.00]World".to_string(),
            translation: Some("[00:01.10]你好".to_string()),
            source: LyricsSource::Cache,
        };

        let track = resolved.to_track(true);
        assert_eq!(track.len(), 2);
        assert_eq!(track.lines[0].translated_text.as_deref(), Some("你好"));

        let plain = resolved.to_track(false);
        assert!(!plain.has_translation());
    }

    #[tokio::test]
    async fn test_resolve_prefers_library_then_cache_then_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("data")).await.unwrap();
        let cache = dir.path().join("cache");
        let settings = Settings::default();

        let audio = dir.path().join("song.mp3");
        std::fs::write(&audio, b"not really audio").unwrap();
        std::fs::write(dir.path().join("song.lrc"), "[00:02.00]Sidecar").unwrap();

        let mut song = Song::new(audio.to_string_lossy());

        let resolved = resolve_lyrics(&db, None, &song, &settings, &cache)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(resolved.source, LyricsSource::Local(LyricsOrigin::Sidecar(_))));

        save_lyrics_cache(&cache, &song.id, "[00:01.00]Cached", None).unwrap();
        let resolved = resolve_lyrics(&db, None, &song, &settings, &cache)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.source, LyricsSource::Cache);
        assert_eq!(resolved.raw, "[00:01.00]Cached");

        song.lyrics = Some("[00:00.50]Stored".to_string());
        let resolved = resolve_lyrics(&db, None, &song, &settings, &cache)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.source, LyricsSource::Library);
        assert_eq!(resolved.to_track(true).lines[0].text, "Stored");
    }

    #[tokio::test]
    async fn test_resolve_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("data")).await.unwrap();
        let song = Song::new(dir.path().join("missing.mp3").to_string_lossy());

        let resolved = resolve_lyrics(&db, None, &song, &Settings::default(), dir.path())
            .await
            .unwrap();
        assert!(resolved.is_none());
    }
}
