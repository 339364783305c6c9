//! Listening statistics

use anyhow::Result;

use super::{KEY_STATS, current_timestamp, get_all_songs, set_library};
use crate::database::{KvStore, Stats};

pub async fn get_stats(store: &KvStore) -> Result<Stats> {
    Ok(store.get(KEY_STATS).await.unwrap_or_default())
}

pub async fn set_stats(store: &KvStore, stats: &Stats) -> Result<()> {
    store.set(KEY_STATS, stats).await
}

/// Bump the global play counter and the song's own counter
pub async fn increment_play_count(store: &KvStore, path: &str) -> Result<()> {
    let now = current_timestamp();

    let mut stats = get_stats(store).await?;
    stats.songs_played += 1;
    stats.last_played = Some(now);

    let mut library = get_all_songs(store).await?;
    if let Some(song) = library.iter_mut().find(|s| s.path == path) {
        song.play_count += 1;
        song.last_played = Some(now);
        set_library(store, &library).await?;
    } else {
        tracing::debug!("Play count for {} not in library, only global stats updated", path);
    }

    set_stats(store, &stats).await
}

pub async fn add_play_time(store: &KvStore, secs: f64) -> Result<()> {
    if !secs.is_finite() || secs <= 0.0 {
        return Ok(());
    }
    let mut stats = get_stats(store).await?;
    stats.total_play_time += secs;
    set_stats(store, &stats).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Song;
    use crate::database::ops::add_songs;

    #[tokio::test]
    async fn test_increment_play_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), "t_").await.unwrap();
        add_songs(&store, vec![Song::new("/a")]).await.unwrap();

        increment_play_count(&store, "/a").await.unwrap();
        increment_play_count(&store, "/a").await.unwrap();
        increment_play_count(&store, "/missing").await.unwrap();

        let stats = get_stats(&store).await.unwrap();
        assert_eq!(stats.songs_played, 3);
        assert!(stats.last_played.is_some());

        let song = &get_all_songs(&store).await.unwrap()[0];
        assert_eq!(song.play_count, 2);
        assert!(song.last_played.is_some());
    }

    #[tokio::test]
    async fn test_add_play_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path(), "t_").await.unwrap();
        add_play_time(&store, 1.5).await.unwrap();
        add_play_time(&store, -3.0).await.unwrap();
        add_play_time(&store, f64::NAN).await.unwrap();
        assert_eq!(get_stats(&store).await.unwrap().total_play_time, 1.5);
    }
}
